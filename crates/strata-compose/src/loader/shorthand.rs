//! Shorthand string parsing for port and mount declarations using `nom`.
//!
//! Ports follow `[ip:][host:]container[/protocol]`, mounts follow
//! `[source:]target[:mode]`. The parsers return `None` on malformed input;
//! the loader attaches the owning service and field when reporting the
//! failure.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1},
    combinator::{all_consuming, opt, value},
    multi::separated_list1,
    sequence::terminated,
};

use crate::model::{Mount, MountSource, PortBinding, Protocol};

/// Parses a non-zero port number.
fn port_number(input: &str) -> IResult<&str, u16> {
    let (rest, digits) = digit1(input)?;
    let port: u16 = digits.parse().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    if port == 0 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }
    Ok((rest, port))
}

/// Parses an IPv4 host interface followed by its separating colon.
fn ip_prefix(input: &str) -> IResult<&str, Ipv4Addr> {
    let (rest, raw) = take_while1(|c: char| c.is_ascii_digit() || c == '.')(input)?;
    let ip: Ipv4Addr = raw.parse().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Verify))
    })?;
    let (rest, _) = char(':')(rest)?;
    Ok((rest, ip))
}

/// Parses a `/tcp` or `/udp` suffix.
fn protocol_suffix(input: &str) -> IResult<&str, Protocol> {
    let (input, _) = char('/')(input)?;
    alt((
        value(Protocol::Tcp, tag("tcp")),
        value(Protocol::Udp, tag("udp")),
    ))
    .parse(input)
}

/// Parses a port shorthand such as `5432`, `8080:80`, or
/// `127.0.0.1:9090:9090/udp`.
///
/// A host interface is only meaningful together with a host port, so
/// `127.0.0.1:80` is rejected.
#[must_use]
pub fn port(input: &str) -> Option<PortBinding> {
    let parsed = all_consuming((
        opt(ip_prefix),
        opt(terminated(port_number, char(':'))),
        port_number,
        opt(protocol_suffix),
    ))
    .parse(input);
    let (_, (host_ip, host, container, protocol)) = parsed.ok()?;
    if host_ip.is_some() && host.is_none() {
        return None;
    }
    Some(PortBinding {
        host_ip,
        host,
        container,
        protocol: protocol.unwrap_or_default(),
    })
}

/// One colon-delimited mount segment.
fn mount_segment(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c != ':')(input)
}

/// A source starting with `/`, `.`, or `~` is a host path; anything else
/// names a top-level volume.
fn classify_source(raw: &str) -> MountSource {
    if raw.starts_with('/') || raw.starts_with('.') || raw.starts_with('~') {
        MountSource::Bind(PathBuf::from(raw))
    } else {
        MountSource::Named(raw.to_string())
    }
}

/// Parses a mount shorthand such as `/tmp/cache`, `pgdata:/var/lib/data`,
/// or `./conf:/etc/app:ro`.
///
/// The container target must be an absolute path. A bare target declares an
/// anonymous volume and admits no mode suffix.
#[must_use]
pub fn mount(input: &str) -> Option<Mount> {
    let parsed = all_consuming(separated_list1(char(':'), mount_segment)).parse(input);
    let (_, segments) = parsed.ok()?;
    let (source, target, read_only) = match segments.as_slice() {
        [target] => (MountSource::Anonymous, *target, false),
        [source, target] => (classify_source(source), *target, false),
        [source, target, mode] => {
            let read_only = match *mode {
                "ro" => true,
                "rw" => false,
                _ => return None,
            };
            (classify_source(source), *target, read_only)
        }
        _ => return None,
    };
    if !target.starts_with('/') {
        return None;
    }
    Some(Mount {
        source,
        target: target.to_string(),
        read_only,
    })
}
