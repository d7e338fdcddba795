//! Wire framing for the front door.
//!
//! Requests arrive on the ROUTER socket as multipart frames
//! `[identity, (delimiter...), task, param_1, ..., param_k]`. zeromq-rs
//! prepends the peer identity on recv and pops it again on send; REQ-style
//! clients additionally insert an empty delimiter frame while DEALER clients
//! do not. The routing prefix — identity plus any empty delimiters — is
//! carried opaquely on the [`Work`] item and echoed verbatim on the reply,
//! so the socket routes the answer back without the core ever tracking
//! connections.
//!
//! Replies are `[identity, (delimiter...), success, empty, payload]` with
//! the two flags as ASCII `true`/`false`. `empty: true` means the task
//! succeeded but found no matching data; on failure the payload holds a
//! plain-text error description instead of JSON.

use bytes::Bytes;
use zeromq::ZmqMessage;

use crate::error::DenormError;

/// Opaque routing token: the leading frames of the originating request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingId(Vec<Bytes>);

impl RoutingId {
    /// Build a token from a single identity frame. The parser produces
    /// tokens directly from inbound frames; this is for constructing work
    /// items by hand, mostly in tests.
    pub fn from_identity(identity: impl Into<Bytes>) -> Self {
        Self(vec![identity.into()])
    }
}

/// One unit of work, parsed from an inbound frame.
///
/// Delivered to exactly one worker and consumed exactly once; never mutated
/// after creation.
#[derive(Debug, Clone)]
pub struct Work {
    pub routing: RoutingId,
    pub task: String,
    pub params: Vec<String>,
}

/// The result of one [`Work`] item, carrying the same routing token.
#[derive(Debug, Clone)]
pub struct Product {
    pub routing: RoutingId,
    pub success: bool,
    /// The task succeeded but found nothing.
    pub empty: bool,
    pub payload: Vec<u8>,
}

impl Product {
    /// Successful task with a serialized result.
    pub fn ok(routing: RoutingId, payload: Vec<u8>) -> Self {
        Self {
            routing,
            success: true,
            empty: false,
            payload,
        }
    }

    /// Successful task that found no matching data.
    pub fn not_found(routing: RoutingId) -> Self {
        Self {
            routing,
            success: true,
            empty: true,
            payload: Vec::new(),
        }
    }

    /// Failed task; the payload is a human-readable description.
    pub fn failure(routing: RoutingId, reason: impl Into<String>) -> Self {
        Self {
            routing,
            success: false,
            empty: false,
            payload: reason.into().into_bytes(),
        }
    }
}

/// Outcome of parsing one inbound multipart message.
#[derive(Debug)]
pub enum Inbound {
    /// A well-formed request.
    Work(Work),
    /// Routing frames followed by no task at all; answered with a
    /// synthesized `no task specified` failure.
    NoTask(RoutingId),
    /// Not even routable; dropped.
    Ignore,
}

/// Split an inbound ROUTER message into its routing prefix and request
/// parts.
///
/// A message carrying only the identity frame cannot be a request and is
/// ignored; identity followed exclusively by empty delimiter frames gets a
/// `no task specified` reply. Everything else becomes a work item — a bare
/// task with zero params is valid (that is how `ping` arrives).
pub fn parse_request(msg: &ZmqMessage) -> Inbound {
    let frames: Vec<Bytes> = msg.iter().cloned().collect();
    if frames.len() < 2 {
        return Inbound::Ignore;
    }

    // Identity first, then skip empty delimiter frames to find the body.
    let mut body = 1;
    while body < frames.len() && frames[body].is_empty() {
        body += 1;
    }
    if body == frames.len() {
        return Inbound::NoTask(RoutingId(frames));
    }

    let task = String::from_utf8_lossy(&frames[body]).into_owned();
    let params = frames[body + 1..]
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect();
    let routing = RoutingId(frames[..body].to_vec());

    Inbound::Work(Work {
        routing,
        task,
        params,
    })
}

/// Encode a product as the reply message
/// `[routing..., success, empty, payload]`.
pub fn encode_reply(product: Product) -> Result<ZmqMessage, DenormError> {
    let mut frames = product.routing.0.into_iter();
    let Some(identity) = frames.next() else {
        return Err(DenormError::Transport(
            "product with an empty routing token".into(),
        ));
    };

    let mut msg = ZmqMessage::from(identity.to_vec());
    for frame in frames {
        msg.push_back(frame);
    }
    msg.push_back(flag(product.success));
    msg.push_back(flag(product.empty));
    msg.push_back(Bytes::from(product.payload));
    Ok(msg)
}

fn flag(value: bool) -> Bytes {
    if value {
        Bytes::from_static(b"true")
    } else {
        Bytes::from_static(b"false")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(frames: &[&[u8]]) -> ZmqMessage {
        let mut msg = ZmqMessage::from(frames[0].to_vec());
        for frame in &frames[1..] {
            msg.push_back(Bytes::copy_from_slice(frame));
        }
        msg
    }

    #[test]
    fn parse_dealer_style_request() {
        let msg = message(&[b"peer-1", b"question", b"0123456789abcdef01234567"]);
        let Inbound::Work(work) = parse_request(&msg) else {
            panic!("expected a work item");
        };
        assert_eq!(work.task, "question");
        assert_eq!(work.params, vec!["0123456789abcdef01234567"]);
        assert_eq!(work.routing, RoutingId::from_identity(&b"peer-1"[..]));
    }

    #[test]
    fn parse_req_style_request_keeps_delimiter_in_routing() {
        let msg = message(&[b"peer-1", b"", b"questionJoins", b"0123456789abcdef01234567", b"5", b"1"]);
        let Inbound::Work(work) = parse_request(&msg) else {
            panic!("expected a work item");
        };
        assert_eq!(work.task, "questionJoins");
        assert_eq!(work.params.len(), 3);
        // Identity plus the empty delimiter travel together.
        assert_eq!(
            work.routing,
            RoutingId(vec![Bytes::from_static(b"peer-1"), Bytes::new()])
        );
    }

    #[test]
    fn parse_zero_param_task() {
        let msg = message(&[b"peer-1", b"ping"]);
        let Inbound::Work(work) = parse_request(&msg) else {
            panic!("expected a work item");
        };
        assert_eq!(work.task, "ping");
        assert!(work.params.is_empty());
    }

    #[test]
    fn parse_identity_only_is_ignored() {
        let msg = message(&[b"peer-1"]);
        assert!(matches!(parse_request(&msg), Inbound::Ignore));
    }

    #[test]
    fn parse_delimiter_only_has_no_task() {
        let msg = message(&[b"peer-1", b""]);
        let Inbound::NoTask(routing) = parse_request(&msg) else {
            panic!("expected NoTask");
        };
        // The reply must still be routable.
        let reply = encode_reply(Product::failure(routing, "no task specified")).unwrap();
        let frames: Vec<Bytes> = reply.iter().cloned().collect();
        assert_eq!(frames[0], Bytes::from_static(b"peer-1"));
        assert_eq!(frames[frames.len() - 1], Bytes::from_static(b"no task specified"));
    }

    #[test]
    fn encode_reply_frames() {
        let routing = RoutingId::from_identity(&b"peer-9"[..]);
        let msg = encode_reply(Product::ok(routing, b"{\"x\":1}".to_vec())).unwrap();
        let frames: Vec<Bytes> = msg.iter().cloned().collect();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0], Bytes::from_static(b"peer-9"));
        assert_eq!(frames[1], Bytes::from_static(b"true"));
        assert_eq!(frames[2], Bytes::from_static(b"false"));
        assert_eq!(frames[3], Bytes::from_static(b"{\"x\":1}"));
    }

    #[test]
    fn encode_not_found_sets_empty_flag() {
        let routing = RoutingId::from_identity(&b"peer-9"[..]);
        let msg = encode_reply(Product::not_found(routing)).unwrap();
        let frames: Vec<Bytes> = msg.iter().cloned().collect();
        assert_eq!(frames[1], Bytes::from_static(b"true"));
        assert_eq!(frames[2], Bytes::from_static(b"true"));
        assert!(frames[3].is_empty());
    }
}
