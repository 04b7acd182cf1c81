//! Answers the first request of every connection and logs whatever follows its header.
//!
//! ```text
//! cargo run -p micro-sock --example line_server -- --port 8080 --header-timeout-ms 500
//! printf 'GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\nsome trailing data' | nc localhost 8080
//! ```

use std::time::Duration;

use clap::Parser;
use micro_sock::codec::Delimiter;
use micro_sock::config::{DEFAULT_READ_BUFFER_SIZE, RequestConfig};
use micro_sock::connection::{Connection, ConnectionSource, RequestSplit};
use micro_sock::protocol::{HeaderRecord, StreamEvent};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(about = "Line-oriented responder on top of micro-sock")]
struct Args {
    /// Port to listen on, 0 picks a free one
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Time allowed between the request line and the blank line ending the header
    #[arg(long, default_value_t = 200)]
    header_timeout_ms: u64,

    /// Time allowed before the request line arrives; unbounded when absent
    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_READ_BUFFER_SIZE)]
    read_buffer_size: usize,

    /// Regular expression splitting tokens instead of the line break
    #[arg(long)]
    delimiter: Option<String>,
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let args = Args::parse();
    let delimiter = match args.delimiter.as_deref().map(Delimiter::pattern).transpose() {
        Ok(delimiter) => delimiter.unwrap_or_default(),
        Err(e) => {
            error!(cause = %e, "invalid delimiter");
            return;
        }
    };
    let config = RequestConfig::new()
        .with_delimiter(delimiter)
        .with_read_buffer_size(args.read_buffer_size)
        .with_header_timeout(Duration::from_millis(args.header_timeout_ms))
        .with_idle_timeout(args.idle_timeout_ms.map(Duration::from_millis));

    let source = match ConnectionSource::bind(args.port) {
        Ok(source) => source,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    let error = source.serve(move |connection| handle(connection, &config));
    error!(cause = %error, "stop serving");
}

fn handle(connection: Connection, config: &RequestConfig) {
    let id = connection.id();
    let writer = connection.writer();
    let RequestSplit { headers, tail, pipeline } = connection.split(config);

    let worker = match pipeline.spawn() {
        Ok(worker) => worker,
        Err(e) => {
            warn!(connection = id, cause = %e, "failed to start pipeline");
            return;
        }
    };

    match headers.wait() {
        Ok(Some(record)) => {
            info!(connection = id, method = %record.method(), target = record.target(), "receive request header");
            if let Err(e) = writer.write(response(&record).as_bytes()) {
                warn!(connection = id, cause = %e, "failed to send response");
            }
        }
        Ok(None) => info!(connection = id, "peer closed before sending a request"),
        Err(e) => warn!(connection = id, cause = %e, "no request header"),
    }

    for event in tail {
        match event {
            StreamEvent::Data(token) => info!(connection = id, index = token.index(), token = %token.text(), "receive tail token"),
            StreamEvent::Completed => break,
            StreamEvent::Failed(e) => {
                warn!(connection = id, cause = %e, "tail failed");
                break;
            }
        }
    }

    if worker.join().is_err() {
        error!(connection = id, "pipeline worker panicked");
    }
}

fn response(record: &HeaderRecord) -> String {
    let body = format!("{} {} with {} header(s)\r\n", record.method(), record.target(), record.headers().len());
    format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{body}", body.len())
}
