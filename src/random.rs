//! Seeded jitter source.
//!
//! The seed comes from an external random-integer service once at startup.
//! Any failure there is recovered with a locally generated seed.

use std::time::Duration;

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use reqwest::{blocking::Client, StatusCode};
use tracing::info;

use crate::error::SeedError;

pub const DEFAULT_SEED_URL: &str =
    "https://www.random.org/integers/?num=1&min=0&max=100000&col=1&base=10&format=plain&rnd=new";

/// Largest seed the service hands out; local fallback seeds share the range.
pub const SEED_MAX: u64 = 100_000;

pub const JITTER_MIN: Duration = Duration::from_micros(500);
pub const JITTER_MAX: Duration = Duration::from_millis(2);

/// Pseudorandom jitter stream shared by every click worker.
pub struct RandomSource {
    seed: u64,
    rng: Mutex<StdRng>,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw from [`JITTER_MIN`, `JITTER_MAX`].
    pub fn next_jitter(&self) -> Duration {
        let secs = self
            .rng
            .lock()
            .gen_range(JITTER_MIN.as_secs_f64()..=JITTER_MAX.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Ask the seed service for one integer.
///
/// Only a `200 OK` with a plain-text integer in `0..=SEED_MAX` is accepted.
pub fn request_seed(url: &str, timeout: Duration) -> Result<u64, SeedError> {
    let client = Client::builder().timeout(timeout).build()?;
    read_seed(&client, url)
}

fn read_seed(client: &Client, url: &str) -> Result<u64, SeedError> {
    let response = client
        .get(url)
        .header("User-Agent", concat!("simpleclick/", env!("CARGO_PKG_VERSION")))
        .send()?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(SeedError::Status(status));
    }

    let body = response.text()?;
    let seed = body
        .trim()
        .parse::<u64>()
        .map_err(|source| SeedError::Parse {
            body: body.trim().to_owned(),
            source,
        })?;

    if seed > SEED_MAX {
        return Err(SeedError::OutOfRange(seed));
    }
    Ok(seed)
}

/// Seed for the jitter stream. Never fails: service errors fall back to
/// [`local_seed`].
pub fn fetch_seed(url: &str, timeout: Duration) -> u64 {
    match request_seed(url, timeout) {
        Ok(seed) => {
            info!(seed, "fetched seed from service");
            seed
        }
        Err(err) => {
            let seed = local_seed();
            info!(%err, seed, "seed service unavailable, using local seed");
            seed
        }
    }
}

pub fn local_seed() -> u64 {
    rand::thread_rng().gen_range(0..=SEED_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{Read, Write},
        net::{TcpListener, TcpStream},
        thread,
        time::Instant,
    };

    /// Serve exactly one connection on localhost with `respond`, return the URL.
    fn serve_once<F>(respond: F) -> String
    where
        F: FnOnce(TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let mut seen = Vec::new();
                while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => seen.extend_from_slice(&buf[..n]),
                    }
                }
                respond(stream);
            }
        });
        format!("http://{addr}/integers")
    }

    /// Client that talks to localhost directly, whatever proxy the environment sets.
    fn local_client(timeout: Duration) -> Client {
        Client::builder().no_proxy().timeout(timeout).build().unwrap()
    }

    fn reply(status: &'static str, body: &'static str) -> impl FnOnce(TcpStream) + Send {
        move |mut stream| {
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = RandomSource::new(1234);
        let b = RandomSource::new(1234);
        let xs: Vec<_> = (0..32).map(|_| a.next_jitter()).collect();
        let ys: Vec<_> = (0..32).map(|_| b.next_jitter()).collect();
        assert_eq!(xs, ys);

        let c = RandomSource::new(1235);
        let zs: Vec<_> = (0..32).map(|_| c.next_jitter()).collect();
        assert_ne!(xs, zs);
    }

    #[test]
    fn test_seed_42_golden_vector() {
        let source = RandomSource::new(42);
        let golden = [
            0.001_289_836_113_504_160_9,
            0.001_314_087_814_854_716,
            0.001_454_697_648_715_842_8,
        ];
        for expected in golden {
            let got = source.next_jitter().as_secs_f64();
            assert!(
                (got - expected).abs() < 2e-9,
                "expected {expected}, got {got}"
            );
        }
    }

    #[test]
    fn test_jitter_stays_in_range() {
        for seed in [0, 1, 42, 99_999, SEED_MAX, u64::MAX] {
            let source = RandomSource::new(seed);
            for _ in 0..2_000 {
                let j = source.next_jitter();
                assert!(j >= JITTER_MIN && j <= JITTER_MAX, "{j:?} for seed {seed}");
            }
        }
    }

    #[test]
    fn test_local_seed_in_range() {
        for _ in 0..1_000 {
            assert!(local_seed() <= SEED_MAX);
        }
    }

    #[test]
    fn test_request_seed_ok() {
        let url = serve_once(reply("200 OK", "4242\n"));
        let seed = read_seed(&local_client(Duration::from_secs(5)), &url).unwrap();
        assert_eq!(seed, 4242);
    }

    #[test]
    fn test_request_seed_server_error() {
        let url = serve_once(reply("500 Internal Server Error", "oops"));
        let err = read_seed(&local_client(Duration::from_secs(5)), &url).unwrap_err();
        assert!(matches!(err, SeedError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_request_seed_malformed_body() {
        let url = serve_once(reply("200 OK", "not a number"));
        let err = read_seed(&local_client(Duration::from_secs(5)), &url).unwrap_err();
        assert!(matches!(err, SeedError::Parse { ref body, .. } if body == "not a number"));
    }

    #[test]
    fn test_request_seed_out_of_range() {
        let url = serve_once(reply("200 OK", "100001"));
        let err = read_seed(&local_client(Duration::from_secs(5)), &url).unwrap_err();
        assert!(matches!(err, SeedError::OutOfRange(100_001)));
    }

    #[test]
    fn test_request_seed_times_out() {
        let url = serve_once(|stream| {
            thread::sleep(Duration::from_secs(3));
            drop(stream);
        });
        let started = Instant::now();
        let err = read_seed(&local_client(Duration::from_millis(200)), &url).unwrap_err();
        assert!(matches!(err, SeedError::Transport(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_fetch_seed_falls_back_on_timeout() {
        let url = serve_once(|stream| {
            thread::sleep(Duration::from_secs(3));
            drop(stream);
        });
        let started = Instant::now();
        assert!(fetch_seed(&url, Duration::from_millis(200)) <= SEED_MAX);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_fetch_seed_falls_back() {
        let url = serve_once(reply("500 Internal Server Error", ""));
        assert!(fetch_seed(&url, Duration::from_secs(5)) <= SEED_MAX);

        let url = serve_once(reply("200 OK", "garbage"));
        assert!(fetch_seed(&url, Duration::from_secs(5)) <= SEED_MAX);

        // Nothing listens on a port we bound and released.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{port}/");
        assert!(fetch_seed(&url, Duration::from_millis(500)) <= SEED_MAX);
    }
}
