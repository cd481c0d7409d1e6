use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::TaskClass;

/// Handle of the current runtime, or of a shared background runtime when
/// called from outside one.
pub fn runtime_handle() -> Handle {
	if let Ok(handle) = Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("scorekeep-worker-global")
			.build()
			.expect("failed to build scorekeep-worker global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns an async task with classification metadata.
pub fn spawn<F>(class: TaskClass, name: &'static str, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), task = name, "worker.spawn");
	runtime_handle().spawn(fut)
}

/// Spawns an async task on an explicit runtime handle.
///
/// Used by callbacks that may run outside the runtime, such as synchronous
/// event bus subscribers invoked from a plain thread.
pub fn spawn_on<F>(handle: &Handle, class: TaskClass, name: &'static str, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), task = name, "worker.spawn_on");
	handle.spawn(fut)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(flavor = "current_thread")]
	async fn spawned_task_output_is_joinable() {
		let handle = spawn(TaskClass::Trigger, "test.answer", async { 42 });
		assert_eq!(handle.await.ok(), Some(42));
	}

	#[tokio::test(flavor = "current_thread")]
	async fn aborted_task_reports_cancellation() {
		let handle = spawn(TaskClass::Timer, "test.sleeper", async {
			tokio::time::sleep(std::time::Duration::from_secs(60)).await;
		});
		handle.abort();
		let err = handle.await.expect_err("aborted task should not complete");
		assert!(err.is_cancelled());
	}

	#[test]
	fn spawn_on_works_from_outside_the_runtime() {
		let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
		let handle = spawn_on(runtime.handle(), TaskClass::Io, "test.outside", async { "done" });
		assert_eq!(runtime.block_on(handle).ok(), Some("done"));
	}

	fn thread_name() -> Option<String> {
		std::thread::current().name().map(str::to_string)
	}

	#[test]
	fn spawn_falls_back_to_global_runtime() {
		let handle = spawn(TaskClass::Io, "test.global", async { thread_name() });
		let (tx, rx) = std::sync::mpsc::channel();
		spawn_on(&runtime_handle(), TaskClass::Trigger, "test.join", async move {
			let _ = tx.send(handle.await.ok().flatten());
		});
		let name = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
		assert_eq!(name.as_deref(), Some("scorekeep-worker-global"));
	}

	#[test]
	fn runtime_handle_prefers_current_runtime() {
		let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
		let name = runtime.block_on(async { spawn(TaskClass::Trigger, "test.local", async { thread_name() }).await.ok().flatten() });
		assert_eq!(name, thread_name());
	}
}
