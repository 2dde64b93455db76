//! The single thread allowed to mutate editor and world state.
//!
//! Work is handed to the logic thread as boxed jobs over a channel. A bridge
//! running stand-alone spawns a dedicated thread with [`LogicThread::spawn`];
//! an embedding host that already owns a frame loop binds its own thread with
//! [`LogicThread::bind_current`] and pumps jobs through [`LogicLoop`].

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle, ThreadId};

use thiserror::Error;
use tracing::{debug, error, warn};

const LOGIC_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::logic");

/// Unit of work executed on the logic thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Stop,
}

/// Errors raised while spawning or talking to the logic thread.
#[derive(Debug, Error)]
pub enum LogicThreadError {
    /// The logic thread has stopped and no longer accepts work.
    #[error("logic thread is no longer accepting work")]
    Stopped,
    /// The operating system refused to spawn the thread.
    #[error("failed to spawn logic thread: {source}")]
    Spawn {
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
    /// A job escaped its own panic guard and took the thread down.
    #[error("logic thread panicked")]
    ThreadPanic,
}

/// Cloneable handle used to post work to the logic thread.
#[derive(Clone)]
pub struct LogicThreadHandle {
    sender: Sender<Message>,
    thread_id: ThreadId,
}

impl std::fmt::Debug for LogicThreadHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LogicThreadHandle")
            .field("thread_id", &self.thread_id)
            .finish_non_exhaustive()
    }
}

impl LogicThreadHandle {
    /// Returns true when called from the logic thread itself.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Identity of the logic thread.
    #[must_use]
    pub const fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Queues `job` to run on the logic thread after previously posted work.
    ///
    /// # Errors
    ///
    /// Returns [`LogicThreadError::Stopped`] once the logic thread has shut
    /// down. The job is dropped without running.
    pub fn post<F>(&self, job: F) -> Result<(), LogicThreadError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Message::Run(Box::new(job)))
            .map_err(|_| LogicThreadError::Stopped)
    }
}

/// Owner of a dedicated logic thread.
pub struct LogicThread {
    handle: LogicThreadHandle,
    join: Option<JoinHandle<()>>,
}

impl LogicThread {
    /// Spawns a named logic thread that runs posted jobs in FIFO order.
    ///
    /// # Errors
    ///
    /// Returns [`LogicThreadError::Spawn`] when the thread cannot be created.
    pub fn spawn(name: &str) -> Result<Self, LogicThreadError> {
        let (sender, receiver) = mpsc::channel();
        let join = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || run_until_stopped(&receiver))
            .map_err(|source| LogicThreadError::Spawn { source })?;
        let thread_id = join.thread().id();
        Ok(Self {
            handle: LogicThreadHandle { sender, thread_id },
            join: Some(join),
        })
    }

    /// Binds the calling thread as the logic thread.
    ///
    /// Posted jobs only run when the returned [`LogicLoop`] is pumped from
    /// this same thread.
    #[must_use]
    pub fn bind_current() -> (LogicThreadHandle, LogicLoop) {
        let (sender, receiver) = mpsc::channel();
        let thread_id = thread::current().id();
        (
            LogicThreadHandle { sender, thread_id },
            LogicLoop {
                receiver,
                thread_id,
            },
        )
    }

    /// Returns a handle for posting work.
    #[must_use]
    pub fn handle(&self) -> LogicThreadHandle {
        self.handle.clone()
    }

    /// Stops the thread once already-posted jobs have run, then joins it.
    ///
    /// # Errors
    ///
    /// Returns [`LogicThreadError::ThreadPanic`] if the thread terminated by
    /// panicking.
    pub fn shutdown(mut self) -> Result<(), LogicThreadError> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<(), LogicThreadError> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        if self.handle.sender.send(Message::Stop).is_err() {
            debug!(target: LOGIC_TARGET, "logic thread already stopped");
        }
        if self.handle.is_current() {
            // Joining ourselves would deadlock; the stop message ends the loop.
            return Ok(());
        }
        join.join().map_err(|_| LogicThreadError::ThreadPanic)
    }
}

impl Drop for LogicThread {
    fn drop(&mut self) {
        if let Err(error) = self.stop_and_join() {
            warn!(target: LOGIC_TARGET, %error, "logic thread did not stop cleanly");
        }
    }
}

/// Job pump for a thread bound with [`LogicThread::bind_current`].
pub struct LogicLoop {
    receiver: Receiver<Message>,
    thread_id: ThreadId,
}

impl LogicLoop {
    /// Runs every job queued so far, including jobs those jobs post.
    ///
    /// Returns the number of jobs executed. Calling this from any thread other
    /// than the bound one runs nothing.
    pub fn run_pending(&self) -> usize {
        if thread::current().id() != self.thread_id {
            warn!(
                target: LOGIC_TARGET,
                "logic loop pumped from a foreign thread; ignoring"
            );
            return 0;
        }
        let mut executed = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(Message::Run(job)) => {
                    run_job(job);
                    executed += 1;
                }
                Ok(Message::Stop) => {}
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return executed,
            }
        }
    }
}

fn run_until_stopped(receiver: &Receiver<Message>) {
    debug!(target: LOGIC_TARGET, "logic thread started");
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(job) => run_job(job),
            Message::Stop => break,
        }
    }
    debug!(target: LOGIC_TARGET, "logic thread stopped");
}

fn run_job(job: Job) {
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!(target: LOGIC_TARGET, "job panicked on the logic thread");
    }
}
