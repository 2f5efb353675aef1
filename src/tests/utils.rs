// src/tests/utils.rs

use crate::config::{BoundingBox, Config};
use crate::domain::{GeoPoint, Listing};
use crate::notify::{Notifier, NotifyError};
use crate::scraper::{ListingSource, ScraperError};
use crate::sink::CsvSink;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// `{bed: 1, max_price: 2000, bounding_boxes: {}}`
pub fn test_config(boxes: Vec<BoundingBox>) -> Config {
    Config {
        bed: 1,
        min_price: None,
        max_price: 2000.0,
        bounding_boxes: boxes,
        craigslist_site: "sfbay".to_string(),
        craigslist_area: None,
        run_interval: Duration::from_secs(30 * 60),
        result_limit: 1000,
        transport: None,
    }
}

pub fn listing(name: &str, bed: u32, price: f64, lat: f64, lon: f64) -> Listing {
    Listing {
        id: None,
        name: name.to_string(),
        url: format!("http://x/{name}"),
        price,
        bedroom_count: bed,
        neighborhood_label: "?".to_string(),
        location: Some(GeoPoint::new(lat, lon)),
        posted: None,
    }
}

/// Fresh CSV sink in the temp dir.
pub fn temp_sink(tag: &str) -> CsvSink {
    let path: PathBuf = std::env::temp_dir().join(format!(
        "finder_{tag}_{}.csv",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    CsvSink::create(path).unwrap_or_else(|e| panic!("Sink creation failed: {e}"))
}

pub fn csv_lines(sink_path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(sink_path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Serves queued fetch results in order, then repeats the last snapshot.
#[derive(Clone, Default)]
pub struct FakeSource {
    queue: Rc<RefCell<VecDeque<Result<Vec<Listing>, String>>>>,
    last: Rc<RefCell<Vec<Listing>>>,
    pub calls: Rc<RefCell<usize>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, snapshot: Vec<Listing>) {
        self.queue.borrow_mut().push_back(Ok(snapshot));
    }

    pub fn push_error(&self, msg: &str) {
        self.queue.borrow_mut().push_back(Err(msg.to_string()));
    }
}

impl ListingSource for FakeSource {
    fn fetch_listings(&mut self) -> Result<Vec<Listing>, ScraperError> {
        *self.calls.borrow_mut() += 1;
        match self.queue.borrow_mut().pop_front() {
            Some(Ok(snapshot)) => {
                *self.last.borrow_mut() = snapshot.clone();
                Ok(snapshot)
            }
            Some(Err(msg)) => Err(ScraperError::Network(msg)),
            None => Ok(self.last.borrow().clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    Deliver,
    Reject,
    Undeliver,
    Disconnect,
}

/// Records every listing it is asked to send. Outcomes are consumed per call;
/// once they run out every send succeeds.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Rc<RefCell<Vec<Listing>>>,
    outcomes: Rc<RefCell<VecDeque<Outcome>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(&self, outcome: Outcome) -> &Self {
        self.outcomes.borrow_mut().push_back(outcome);
        self
    }

    pub fn sent_names(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|l| l.name.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, listing: &Listing) -> Result<(), NotifyError> {
        let outcome = self.outcomes.borrow_mut().pop_front().unwrap_or(Outcome::Deliver);
        match outcome {
            Outcome::Deliver => {
                self.sent.borrow_mut().push(listing.clone());
                Ok(())
            }
            Outcome::Reject => {
                self.sent.borrow_mut().push(listing.clone());
                Err(NotifyError::Rejected("recipient refused".into()))
            }
            Outcome::Undeliver => Err(NotifyError::Undelivered("535 authentication failed".into())),
            Outcome::Disconnect => Err(NotifyError::Connection("connection reset".into())),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Plain SMTP server on loopback. Every connection is greeted with
/// `greeting`; a non-220 greeting is followed by a hang-up. `RCPT` for an
/// address in `refused` gets a 550, everything else is accepted. Returns the
/// port and the number of messages that made it through `DATA`.
pub fn fake_smtp(greeting: &'static str, refused: &'static [&'static str]) -> (u16, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let Ok(mut writer) = stream.try_clone() else { continue };
            let mut reader = BufReader::new(stream);
            if writer.write_all(greeting.as_bytes()).is_err() || !greeting.starts_with("220") {
                continue;
            }

            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let command = line.to_ascii_uppercase();
                let reply = if command.starts_with("EHLO") || command.starts_with("HELO") {
                    "250 localhost\r\n"
                } else if command.starts_with("RCPT") {
                    if refused.iter().any(|addr| line.contains(addr)) {
                        "550 5.1.1 No such user\r\n"
                    } else {
                        "250 OK\r\n"
                    }
                } else if command.starts_with("DATA") {
                    if writer.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").is_err() {
                        break;
                    }
                    loop {
                        line.clear();
                        if reader.read_line(&mut line).unwrap_or(0) == 0 || line == ".\r\n" {
                            break;
                        }
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                    "250 Queued\r\n"
                } else if command.starts_with("QUIT") {
                    let _ = writer.write_all(b"221 Bye\r\n");
                    break;
                } else {
                    "250 OK\r\n"
                };
                if writer.write_all(reply.as_bytes()).is_err() {
                    break;
                }
            }
        }
    });

    (port, delivered)
}
