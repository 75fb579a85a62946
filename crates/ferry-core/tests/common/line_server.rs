//! Minimal line-oriented TCP server for integration tests.
//!
//! Each accepted connection plays the next [`Session`] of a script (the last
//! one repeats). A complete session ends with an `END` line; anything else is
//! a broken transfer from the client's point of view.

use std::io::Write;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Terminates a complete session.
pub const END: &str = "END";

#[derive(Debug, Clone)]
pub enum Session {
    /// Close the connection without writing anything.
    Hangup,
    /// Write these lines, then close without `END`.
    Partial(Vec<&'static str>),
    /// Write these lines followed by `END`.
    Complete(Vec<&'static str>),
}

pub struct LineServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
}

impl LineServer {
    /// Connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(script: Vec<Session>) -> LineServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&connections);
    thread::spawn(move || {
        for mut stream in listener.incoming().flatten() {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let session = script
                .get(n)
                .or_else(|| script.last())
                .cloned()
                .unwrap_or(Session::Hangup);
            let _ = match session {
                Session::Hangup => Ok(()),
                Session::Partial(lines) => write_lines(&mut stream, &lines),
                Session::Complete(lines) => write_lines(&mut stream, &lines)
                    .and_then(|()| writeln!(stream, "{}", END)),
            };
        }
    });
    LineServer { addr, connections }
}

fn write_lines(stream: &mut impl Write, lines: &[&str]) -> std::io::Result<()> {
    for line in lines {
        writeln!(stream, "{}", line)?;
    }
    stream.flush()
}

/// An address nothing listens on.
pub fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().unwrap()
}
