//! 会话监管：取消信号
//!
//! 持有 CancellationToken，调用方可在任意时刻取消；控制器在每次状态转换前检查。
//! 每次处理输入使用子 token，取消过的父 token 在下一次输入前重新装填。

use tokio_util::sync::CancellationToken;

/// 会话级生命周期管理：取消令牌
#[derive(Debug)]
pub struct SessionSupervisor {
    /// 用户 Cancel 时触发
    cancel_token: CancellationToken,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self {
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 触发取消（用户 Ctrl+C / 前端中止）
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// 已取消时换一个新的 token，供下一次输入使用
    pub fn rearm(&mut self) {
        if self.cancel_token.is_cancelled() {
            self.cancel_token = CancellationToken::new();
        }
    }

    /// 创建子 token（用于单次输入）
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

impl Default for SessionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_propagates_to_child() {
        let sup = SessionSupervisor::new();
        let child = sup.child_token();
        sup.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_rearm_after_cancel() {
        let mut sup = SessionSupervisor::new();
        sup.cancel();
        sup.rearm();
        assert!(!sup.is_cancelled());
        assert!(!sup.child_token().is_cancelled());
    }
}
