//! Minimal echo server: accepts one TCP client and answers every request
//! with its own params.
//!
//! Run with:
//!   cargo run --example echo-server -- header
//!
//! In another terminal:
//!   printf 'Content-Length: 53\r\n\r\n{"jsonrpc":"2.0","id":1,"method":"echo","params":[1]}' \
//!     | nc 127.0.0.1 <port>

use std::net::TcpListener;

use jsonrpc2::{CancellationToken, Framer, Message, Response, Stream};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let framer: Framer = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or_default();

    let listener = TcpListener::bind("127.0.0.1:0")?;
    eprintln!("Listening on {} ({framer})", listener.local_addr()?);

    let (conn, addr) = listener.accept()?;
    eprintln!("Client connected: {addr}");
    let stream = framer.wrap(conn)?;
    let cancel = CancellationToken::new();

    loop {
        let message = match stream.read(&cancel) {
            Ok((message, _)) => message,
            Err(err) => {
                eprintln!("Client disconnected: {err}");
                break;
            }
        };

        match message {
            Message::Request(req) => {
                let reply = match req.params {
                    Some(params) => Response::ok(req.id, params),
                    None => Response::result(req.id, &())?,
                };
                stream.write(&cancel, &reply.into())?;
            }
            other => eprintln!("Ignoring {}", other.kind()),
        }
    }

    stream.close()?;
    Ok(())
}
