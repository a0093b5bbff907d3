//! Response body decompression
//!
//! Automatic decompression is turned off on the underlying client so that the
//! decoding behavior stays in one place. Upstreams answer with at most one
//! `Content-Encoding`, which is all this supports.

use brotli::Decompressor;
use flate2::read::{MultiGzDecoder, ZlibDecoder};
use std::io::{self, Read};

/// Decode a response body according to its `Content-Encoding`.
///
/// `encoding` is the first (and in practice only) value of the header, or
/// `None` when the response was not compressed.
pub fn decode_body(encoding: Option<&str>, body: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len() * 2);

    match encoding {
        None | Some("") | Some("identity") => out.extend_from_slice(body),
        Some("gzip") | Some("x-gzip") => {
            MultiGzDecoder::new(body).read_to_end(&mut out)?;
        }
        Some("deflate") => {
            ZlibDecoder::new(body).read_to_end(&mut out)?;
        }
        Some("br") => {
            // The brotli decoder chokes on trailing garbage that some
            // upstreams (notably Brave) append after the final block. Data
            // decoded up to that point is complete, so the error is treated
            // as end-of-stream.
            if let Err(e) = Decompressor::new(body, 4096).read_to_end(&mut out) {
                if !is_excessive_input(&e) {
                    return Err(e);
                }
            }
        }
        Some(other) => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown content encoding: {other}"),
            ));
        }
    }

    Ok(out)
}

fn is_excessive_input(e: &io::Error) -> bool {
    e.to_string().contains("excessive input")
}
