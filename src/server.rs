//! Minimal HTTP/1.1 tile server
//!
//! Serves `GET` and `HEAD /{z}/{x}/{y}.png`. Each connection is handled on
//! its own thread and closed after a single response.

use crate::raster::TileRenderer;
use crate::tile::TileCoord;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest request line or header line accepted, excluding the newline
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// Most header lines read before the request is rejected
pub const MAX_HEADERS: usize = 64;

/// A response ready to be written to the client
#[derive(Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    fn text(status: u16, body: &str) -> Self {
        Response {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    fn png(body: Vec<u8>) -> Self {
        Response {
            status: 200,
            content_type: "image/png",
            body,
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            405 => "Method Not Allowed",
            414 => "URI Too Long",
            431 => "Request Header Fields Too Large",
            _ => "Internal Server Error",
        }
    }

    /// Write status line, headers and, unless `head_only`, the body
    pub fn write_to<W: Write>(&self, writer: &mut W, head_only: bool) -> std::io::Result<()> {
        write!(
            writer,
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len()
        )?;
        if !head_only {
            writer.write_all(&self.body)?;
        }
        writer.flush()
    }
}

/// Bind `listen_addr` and serve tiles until the process exits
pub fn serve(listen_addr: &str, renderer: TileRenderer) -> Result<()> {
    let listener = TcpListener::bind(listen_addr).with_context(|| format!("binding {}", listen_addr))?;
    info!("Listening for tile requests on {}", listener.local_addr()?);

    let renderer = Arc::new(renderer);
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let renderer = Arc::clone(&renderer);
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream, &renderer) {
                        warn!("Connection error: {:#}", e);
                    }
                });
            }
            Err(e) => warn!("Accept error: {}", e),
        }
    }

    Ok(())
}

/// Outcome of reading the request line and headers
#[derive(Debug, PartialEq)]
enum RequestHead {
    /// The client closed the connection before sending anything
    Closed,
    Line(String),
    /// Reading stopped at a limit; the response has been chosen already
    Rejected(Response),
}

/// Outcome of reading one newline-terminated line
#[derive(Debug, PartialEq)]
enum BoundedLine {
    Eof,
    Line(String),
    TooLong,
}

/// Read one line of at most `MAX_LINE_BYTES`, never buffering more than that
fn read_bounded_line<R: BufRead>(reader: &mut R) -> std::io::Result<BoundedLine> {
    let mut buf = Vec::new();
    let limit = (MAX_LINE_BYTES + 2) as u64;
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(BoundedLine::Eof);
    }

    let content = buf
        .strip_suffix(b"\n")
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .unwrap_or(&buf);
    if content.len() > MAX_LINE_BYTES {
        return Ok(BoundedLine::TooLong);
    }
    Ok(BoundedLine::Line(String::from_utf8_lossy(content).into_owned()))
}

/// Read the request line and consume the headers that follow it
fn read_request_head<R: BufRead>(reader: &mut R) -> std::io::Result<RequestHead> {
    let request_line = match read_bounded_line(reader)? {
        BoundedLine::Eof => return Ok(RequestHead::Closed),
        BoundedLine::TooLong => {
            warn!("Request line longer than {} bytes", MAX_LINE_BYTES);
            return Ok(RequestHead::Rejected(Response::text(414, "uri too long")));
        }
        BoundedLine::Line(line) => line,
    };

    // Headers carry nothing we need, but they must be consumed before replying
    for _ in 0..=MAX_HEADERS {
        match read_bounded_line(reader)? {
            BoundedLine::Eof => return Ok(RequestHead::Line(request_line)),
            BoundedLine::Line(header) if header.trim().is_empty() => {
                return Ok(RequestHead::Line(request_line));
            }
            BoundedLine::Line(_) => {}
            BoundedLine::TooLong => break,
        }
    }

    warn!("Request headers exceed {} lines of {} bytes", MAX_HEADERS, MAX_LINE_BYTES);
    Ok(RequestHead::Rejected(Response::text(431, "request header fields too large")))
}

fn handle_connection(stream: TcpStream, renderer: &TileRenderer) -> Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(30)))?;
    stream.set_write_timeout(Some(Duration::from_secs(30)))?;

    let mut reader = BufReader::new(stream.try_clone()?);
    let (response, head_only) = match read_request_head(&mut reader)? {
        RequestHead::Closed => return Ok(()),
        RequestHead::Rejected(response) => (response, false),
        RequestHead::Line(request_line) => {
            let started = Instant::now();
            let response = respond(&request_line, renderer);
            info!(
                "{} -> {} ({} bytes, {:.1?})",
                request_line,
                response.status,
                response.body.len(),
                started.elapsed()
            );
            (response, request_line.starts_with("HEAD "))
        }
    };

    let mut writer = stream;
    response.write_to(&mut writer, head_only).context("writing response")?;
    Ok(())
}

/// Build the response for one HTTP request line
pub fn respond(request_line: &str, renderer: &TileRenderer) -> Response {
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        warn!("Malformed request line {:?}", request_line);
        return Response::text(400, "bad request");
    };
    if method != "GET" && method != "HEAD" {
        return Response::text(405, "method not allowed");
    }

    let path = target.split('?').next().unwrap_or(target);
    let coord = match TileCoord::from_path(path) {
        Ok(coord) => coord,
        Err(e) => {
            warn!("{}", e);
            return Response::text(400, "bad request");
        }
    };

    debug!("Rendering tile {}", coord);
    let encoded = renderer
        .render(coord)
        .map_err(anyhow::Error::from)
        .and_then(|tile| tile.encode_png());
    match encoded {
        Ok(png) => Response::png(png),
        Err(e) => Response::text(500, &format!("internal server error: {:#}", e)),
    }
}
