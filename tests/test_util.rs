use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use serde_json::Value;
use anyhow::{anyhow, bail, Result};

pub struct Conn {
    child: Child,
    port: u16,
}

impl Conn {
    pub fn post(&self, path: &str, body: &str) -> Result<(u16, Value)> {
        self.request("POST", path, body)
    }

    pub fn request(&self, method: &str, path: &str, body: &str) -> Result<(u16, Value)> {
        let mut stream = TcpStream::connect(("127.0.0.1", self.port))?;
        stream.set_read_timeout(Some(Duration::from_secs(30)))?;
        let req = format!(
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(req.as_bytes())?;
        stream.flush()?;
        let mut raw = String::new();
        stream.read_to_string(&mut raw)?;
        let (head, payload) = raw.split_once("\r\n\r\n").ok_or_else(|| anyhow!("no header terminator"))?;
        let status: u16 = head.split_whitespace().nth(1).ok_or_else(|| anyhow!("no status"))?.parse()?;
        Ok((status, serde_json::from_str(payload)?))
    }
}

impl Drop for Conn {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> Result<u16> {
    let l = TcpListener::bind("127.0.0.1:0")?;
    Ok(l.local_addr()?.port())
}

pub fn spawn_bridge(envs: &[(&str, &str)]) -> Result<Conn> {
    let port = free_port()?;
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_termbridge"));
    cmd.env("PORT", port.to_string()).env("HOST", "127.0.0.1").env("TERMBRIDGE_LOG", "debug");
    for (k, v) in envs { cmd.env(k, v); }
    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::inherit());
    let child = cmd.spawn()?;
    let conn = Conn { child, port };
    let start = Instant::now();
    while TcpStream::connect(("127.0.0.1", port)).is_err() {
        if start.elapsed() > Duration::from_secs(10) { bail!("termbridge did not start on port {}", port); }
        thread::sleep(Duration::from_millis(50));
    }
    Ok(conn)
}
