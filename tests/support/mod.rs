//! Shared end-to-end test support: a tiny in-process HTTP stub standing
//! in for the tournament control plane, and fake `git`/`python3`
//! toolchain scripts standing in for the real ones.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

/// A request captured by [`MockServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// A minimal single-threaded HTTP/1.1 stub bound to an ephemeral local
/// port. Serves one request at a time off a background thread, in the
/// order connections arrive, recording every request and replying with
/// the next queued (status, body) pair (the last queued pair repeats
/// once exhausted).
pub struct MockServer {
    addr: std::net::SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<VecDeque<(u16, Vec<u8>)>>>,
}

impl MockServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(Mutex::new(VecDeque::new()));

        let requests_bg = Arc::clone(&requests);
        let responses_bg = Arc::clone(&responses);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let Some(request) = read_request(stream.try_clone().expect("clone stream")) else {
                    continue;
                };
                requests_bg.lock().unwrap().push(request);
                let (status, body) = {
                    let mut queue = responses_bg.lock().unwrap();
                    if queue.len() > 1 {
                        queue.pop_front().unwrap()
                    } else {
                        queue.front().cloned().unwrap_or((200, b"{}".to_vec()))
                    }
                };
                write_response(stream, status, &body);
            }
        });

        Self { addr, requests, responses }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Queue the next response this server will return. Responses are
    /// consumed in order; once only one remains queued it is reused for
    /// every subsequent request.
    pub fn queue_response(&self, status: u16, body: impl Into<Vec<u8>>) {
        self.responses.lock().unwrap().push_back((status, body.into()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn read_request(stream: TcpStream) -> Option<RecordedRequest> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).ok()?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).ok()?;
    }

    Some(RecordedRequest { method, path, body })
}

fn write_response(mut stream: TcpStream, status: u16, body: &[u8]) {
    let reason = match status {
        200 => "OK",
        409 => "Conflict",
        _ => "Status",
    };
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

/// Guards process-wide `PATH` mutation: toolchain fixtures prepend a
/// fixture directory to `PATH` for the fake `git`/`python3` to be found,
/// which is process state, so tests using it must not run concurrently
/// with each other.
pub fn path_mutation_guard() -> &'static Mutex<()> {
    static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    GUARD.get_or_init(|| Mutex::new(()))
}

/// A directory on `PATH` holding fake `git` and `python3` scripts good
/// enough to drive the python3 scaffold recipes without a real
/// toolchain. `python_bin` names the fake interpreter to pass as
/// `--python-bin`.
pub struct Toolchain {
    pub bin_dir: tempfile::TempDir,
    pub python_bin: String,
}

impl Toolchain {
    pub fn install() -> Self {
        let bin_dir = tempfile::tempdir().expect("tempdir");
        write_script(
            bin_dir.path(),
            "git",
            "#!/bin/sh\nexit 0\n",
        );
        write_script(
            bin_dir.path(),
            "fake-python3",
            r#"#!/bin/sh
shift
cmd="$1"
shift
case "$cmd" in
  update)
    exit 0
    ;;
  verify)
    if [ -f REJECT_VERIFY ]; then
      echo "verification failed" 1>&2
      exit 1
    fi
    mkdir -p build
    echo "binary" > build/out.bin
    exit 0
    ;;
  run)
    mkdir -p data
    echo "replay-bytes" > data/replay.bin
    echo "[server] TeamA (A) wins (round 1)"
    echo "[server] TeamA (A) wins (round 2)"
    if [ -f HANG_FOREVER ]; then
      sleep 300
    fi
    exit 0
    ;;
  *)
    exit 1
    ;;
esac
"#,
        );
        Self {
            bin_dir,
            python_bin: "fake-python3".to_string(),
        }
    }

    /// Prepend the fixture bin directory to `PATH`. Caller must hold
    /// [`path_mutation_guard`] for the duration of the test.
    pub fn prepend_to_path(&self) {
        let existing = std::env::var("PATH").unwrap_or_default();
        let new_path = format!("{}:{}", self.bin_dir.path().display(), existing);
        std::env::set_var("PATH", new_path);
    }
}

fn write_script(dir: &std::path::Path, name: &str, contents: &str) {
    let path: PathBuf = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    }
}
