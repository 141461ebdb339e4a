//! 推理模式集成测试

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use overseer::agent::{process_input, reset_session, AgentComponents, Reply};
    use overseer::core::ReasoningPhase;
    use overseer::llm::ScriptedLlmClient;
    use overseer::memory::{ConversationHistory, Message, Role};
    use overseer::reasoning::{
        prompts, AnalysisResult, Complexity, ConvergenceController, CritiqueResult, Preambles, Rating,
        ReasoningSession, Termination,
    };
    use tokio_util::sync::CancellationToken;

    fn plan(steps: &[&str]) -> AnalysisResult {
        AnalysisResult {
            is_question: true,
            complexity: Complexity::Simple,
            reasoning_type: "logical".to_string(),
            perspectives: vec!["place value".to_string(), "common pitfalls".to_string()],
            steps: steps.iter().map(|s| s.to_string()).collect(),
            explanation: "decimal comparison, not version numbers".to_string(),
        }
    }

    fn critique(acc: Rating, sat: Rating, failure: bool) -> CritiqueResult {
        CritiqueResult {
            satisfaction: sat,
            accuracy: acc,
            instructions: "compare the tenths digit explicitly".to_string(),
            failure,
        }
    }

    fn components(mock: &Arc<ScriptedLlmClient>) -> AgentComponents {
        AgentComponents::new(mock.clone(), mock.clone(), Preambles::default(), 8)
    }

    #[tokio::test]
    async fn test_decimal_comparison_scenario() {
        let mock = Arc::new(ScriptedLlmClient::new());
        mock.push_json(&plan(&["compare integer parts", "compare fractional parts"]));
        mock.push_text("Both integer parts are 9.");
        mock.push_text("0.11 vs 0.9: hmm, 11 > 9 so 9.11 is greater.");
        mock.push_json(&critique(Rating::Low, Rating::Low, false));
        mock.push_text("0.9 = 0.90 > 0.11, so 9.9 is greater.");
        mock.push_json(&critique(Rating::High, Rating::High, false));

        let controller = ConvergenceController::new(mock.clone(), mock.clone());
        let mut session = ReasoningSession::new(
            "which is greater, 9.11 or 9.9?",
            ConversationHistory::new("solver"),
            ConversationHistory::new("supervisor"),
        );
        let out = controller
            .run(&mut session, &CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(out.calls.analysis, 1);
        assert_eq!(out.calls.steps, 2);
        assert_eq!(out.calls.critiques, 2);
        assert_eq!(out.calls.refinements, 1);
        assert_eq!(out.calls.plain, 0);
        assert_eq!(out.phase, ReasoningPhase::Done);
        assert_eq!(out.termination, Termination::Converged);
        assert_eq!(out.answer, "0.9 = 0.90 > 0.11, so 9.9 is greater.");
        assert_eq!(session.solver.last().content, out.answer);
        assert_eq!(mock.calls().len(), 6);
    }

    #[tokio::test]
    async fn test_steps_extend_solver_in_order() {
        let mock = Arc::new(ScriptedLlmClient::new());
        mock.push_json(&plan(&["s1", "s2", "s3"]));
        mock.push_text("r1");
        mock.push_text("r2");
        mock.push_text("r3");
        mock.push_json(&critique(Rating::High, Rating::High, false));

        let controller = ConvergenceController::new(mock.clone(), mock.clone());
        let mut session = ReasoningSession::new(
            "q",
            ConversationHistory::new("solver"),
            ConversationHistory::new("supervisor"),
        );
        controller
            .run(&mut session, &CancellationToken::new(), None)
            .await
            .unwrap();

        // 前言 + 用户输入 + supervisor 指引，之后是 3 对（指令, 回复）
        let msgs = session.solver.messages();
        assert_eq!(msgs.len(), 3 + 6);
        let step_msgs = &msgs[3..];
        for (i, pair) in step_msgs.chunks(2).enumerate() {
            assert_eq!(pair[0].role, Role::User);
            assert!(pair[0].content.contains(&format!("s{}", i + 1)));
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[1].content, format!("r{}", i + 1));
        }
    }

    #[tokio::test]
    async fn test_disabled_mode_equivalence() {
        let mock = Arc::new(ScriptedLlmClient::new());
        mock.push_text("direct answer");
        let comps = components(&mock);
        let mut session = comps.new_session();

        let reply = process_input(&comps, &mut session, "hi there", false).await;

        assert_eq!(reply.text(), Some("direct answer"));
        assert_eq!(mock.calls().len(), 1);
        assert_eq!(mock.text_calls(), 1);
    }

    #[tokio::test]
    async fn test_reasoning_reply_is_recorded_in_chat() {
        let mock = Arc::new(ScriptedLlmClient::new());
        mock.push_json(&plan(&["s1"]));
        mock.push_text("step answer");
        mock.push_json(&critique(Rating::High, Rating::High, false));
        let comps = components(&mock);
        let mut session = comps.new_session();

        let reply = process_input(&comps, &mut session, "q", true).await;

        assert!(matches!(reply, Reply::Answer { ref text } if text == "step answer"));
        let msgs = session.solver.messages();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[1], Message::user("q"));
        assert_eq!(msgs[2], Message::assistant("step answer"));
        assert_eq!(session.supervisor.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_step_plan_does_not_reuse_previous_answer() {
        let mock = Arc::new(ScriptedLlmClient::new());
        mock.push_text("Paris is the capital of France.");
        mock.push_json(&plan(&[]));
        mock.push_json(&critique(Rating::High, Rating::High, false));
        let comps = components(&mock);
        let mut session = comps.new_session();

        process_input(&comps, &mut session, "capital of France?", false).await;
        let reply = process_input(&comps, &mut session, "thanks, bye!", true).await;

        let expected = prompts::guidance("decimal comparison, not version numbers");
        assert_eq!(reply.text(), Some(expected.as_str()));
        let answers: Vec<&Message> = session
            .solver
            .messages()
            .iter()
            .filter(|m| m.content == "Paris is the capital of France.")
            .collect();
        assert_eq!(answers.len(), 1);
    }

    #[tokio::test]
    async fn test_supervisor_failure_is_degraded_reply() {
        let mock = Arc::new(ScriptedLlmClient::new());
        mock.push_json(&plan(&["s1"]));
        mock.push_text("weak answer");
        mock.push_json(&critique(Rating::Low, Rating::Low, true));
        let comps = components(&mock);
        let mut session = comps.new_session();

        let reply = process_input(&comps, &mut session, "q", true).await;

        match reply {
            Reply::Degraded { text, termination } => {
                assert_eq!(text, "weak answer");
                assert_eq!(termination, Termination::SupervisorFailure);
            }
            other => panic!("Expected Degraded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reset_idempotence() {
        let mock = Arc::new(ScriptedLlmClient::new());
        let comps = components(&mock);
        let mut session = comps.new_session();
        process_input(&comps, &mut session, "one", false).await;
        process_input(&comps, &mut session, "two", false).await;

        for _ in 0..2 {
            reset_session(&mut session);
            assert_eq!(
                session.solver.messages(),
                &[Message::system(comps.preambles.solver.clone())]
            );
            assert_eq!(
                session.supervisor.messages(),
                &[Message::system(comps.preambles.supervisor.clone())]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_sessions_are_isolated() {
        // 延迟让两个会话的网关调用交错进行
        let mock = Arc::new(ScriptedLlmClient::new().with_latency(Duration::from_millis(10)));
        for _ in 0..2 {
            mock.push_json(&plan(&["s1", "s2"]));
        }
        for _ in 0..2 {
            mock.push_json(&critique(Rating::High, Rating::High, false));
        }
        let comps = components(&mock);
        let mut alice = comps.new_session();
        let mut bob = comps.new_session();

        let (a, b) = futures_util::future::join(
            process_input(&comps, &mut alice, "alice question", true),
            process_input(&comps, &mut bob, "bob question", true),
        )
        .await;

        assert!(a.text().is_some());
        assert!(b.text().is_some());
        let alice_text: String = alice
            .solver
            .messages()
            .iter()
            .map(|m| m.content.clone())
            .collect();
        let bob_text: String = bob
            .solver
            .messages()
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert!(alice_text.contains("alice question"));
        assert!(!alice_text.contains("bob question"));
        assert!(bob_text.contains("bob question"));
        assert!(!bob_text.contains("alice question"));

        // 每次 Solver 调用只看到自己会话的输入
        for call in mock.calls().iter().filter(|c| !c.is_structured()) {
            let seen: String = call.messages.iter().map(|m| m.content.clone()).collect();
            assert!(seen.contains("alice question") ^ seen.contains("bob question"));
        }
    }
}
