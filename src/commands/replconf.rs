//! REPLCONF command implementation.
//!
//! Replicas announce their listening port and capabilities with REPLCONF
//! during the handshake. The values are acknowledged without validation.

use bytes::Bytes;
use tracing::debug;

use crate::resp::RespValue;

pub fn replconf(arguments: &[Bytes]) -> RespValue {
    debug!(?arguments, "REPLCONF acknowledged");

    RespValue::ok()
}
