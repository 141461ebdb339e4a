//! Overseer 命令行前端
//!
//! 入口：初始化日志、按配置创建组件，在标准输入上逐行对话。
//! `/reason` 切换推理模式，`/reset` 清空会话，`/quit` 退出。
//! Ctrl+C 在处理输入期间取消当前推理，在提示符处退出。

use anyhow::Context;
use overseer::agent::{
    create_agent_components_from_env, process_input_interruptible, reset_session, toggle_reasoning,
    Reply,
};
use overseer::reasoning::ReasoningEvent;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    overseer::observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let components =
        create_agent_components_from_env(config_path).context("Failed to create agent")?;
    let mut session = components.new_session();

    // 整个进程只安装一次 SIGINT 监听，由主循环决定是取消还是退出
    let (sigint_tx, mut sigint_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if sigint_tx.send(()).is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = sigint_rx.recv() => None,
        };
        let Some(line) = line else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                reset_session(&mut session);
                println!("(session reset)");
                continue;
            }
            "/reason" => {
                let enabled = toggle_reasoning(&mut session);
                println!("(reasoning {})", if enabled { "on" } else { "off" });
                continue;
            }
            _ => {}
        }

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ReasoningEvent>();
        let printer = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                if let Ok(json) = serde_json::to_string(&ev) {
                    eprintln!("  · {}", json);
                }
            }
        });

        let enabled = session.reasoning_enabled();
        let reply = process_input_interruptible(
            &components,
            &mut session,
            input,
            enabled,
            Some(&tx),
            &mut sigint_rx,
        )
        .await;
        drop(tx);
        let _ = printer.await;

        match reply {
            Reply::Answer { text } => println!("{}", text),
            Reply::Degraded { text, termination } => {
                println!("{}", text);
                println!("(answer did not converge: {:?})", termination);
            }
            Reply::Failure(f) => println!("(error: {})", f.message),
        }
    }

    Ok(())
}
