//! 停止信号
//!
//! 异步侧收到 SIGINT/SIGTERM 后通过 broadcast 广播；同步的帧循环与读取线程
//! 用 `try_recv` 轮询，不阻塞。

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// 是否已收到停止信号。
pub fn shutdown_requested(rx: &mut broadcast::Receiver<()>) -> bool {
    match rx.try_recv() {
        Ok(()) | Err(TryRecvError::Lagged(_)) => true,
        // 发送端全部关闭时不会再有停止信号
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_channel_is_not_a_stop() {
        let (tx, mut rx) = broadcast::channel::<()>(1);
        drop(tx);
        assert!(!shutdown_requested(&mut rx));
    }

    #[test]
    fn sent_message_is_a_stop() {
        let (tx, mut rx) = broadcast::channel::<()>(1);
        assert!(!shutdown_requested(&mut rx));
        tx.send(()).expect("receiver alive");
        assert!(shutdown_requested(&mut rx));
    }
}
