use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use tracing::debug;
use url::form_urlencoded;

/// Dispatcher behaviour selected by the `actn` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TunnelAction {
    /// `C`: report connection info instead of running queries.
    ConnectProbe,
    /// `Q`: run the submitted query batch.
    QueryBatch,
    /// Anything else stops after the success header.
    #[default]
    Other,
}

impl TunnelAction {
    fn from_field(field: &str) -> Self {
        match field {
            "C" => TunnelAction::ConnectProbe,
            "Q" => TunnelAction::QueryBatch,
            _ => TunnelAction::Other,
        }
    }
}

/// Typed parameters of one tunnel request, decoded from the form body.
#[derive(Debug, Clone, Default)]
pub struct TunnelRequest {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub database: String,
    pub action: TunnelAction,
    pub queries: Vec<String>,
}

impl TunnelRequest {
    /// Decodes an `application/x-www-form-urlencoded` body. Missing fields
    /// default to empty strings; repeated `q[]` values keep their
    /// transmission order. With `encodeBase64=1` each query is base64 with
    /// optional missing padding, and queries that fail to decode (or whose
    /// decoded bytes are not UTF-8) are dropped from the batch.
    pub fn from_form(body: &[u8]) -> Self {
        let mut request = TunnelRequest::default();
        let mut base64_queries = false;
        for (key, value) in form_urlencoded::parse(body) {
            match key.as_ref() {
                "login" => request.user = value.into_owned(),
                "password" => request.password = value.into_owned(),
                "host" => request.host = value.into_owned(),
                "port" => request.port = value.into_owned(),
                "db" => request.database = value.into_owned(),
                "actn" => request.action = TunnelAction::from_field(value.as_ref()),
                "encodeBase64" => base64_queries = value.as_ref() == "1",
                "q[]" => request.queries.push(value.into_owned()),
                _ => {}
            }
        }
        if base64_queries {
            request.queries = request
                .queries
                .iter()
                .filter_map(|query| decode_base64_query(query))
                .collect();
        }
        request
    }

    /// `host:port` exactly as the client supplied it.
    pub fn backend_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Standard base64 with missing-padding repair: pad up to the next multiple
/// of four before decoding. The driver's query API carries `&str`, so a
/// payload that decodes to non-UTF-8 bytes is dropped the same way a failed
/// decode is; rewriting the bytes would corrupt the statement.
fn decode_base64_query(query: &str) -> Option<String> {
    let mut padded = query.to_string();
    let trailer = padded.len() % 4;
    if trailer > 0 {
        padded.push_str(&"=".repeat(4 - trailer));
    }
    match BASE64_STANDARD.decode(padded.as_bytes()) {
        Ok(decoded) => match String::from_utf8(decoded) {
            Ok(query) => Some(query),
            Err(e) => {
                debug!("TunnelSrv dropping non-utf8 base64 query err = {e:?}");
                None
            }
        },
        Err(e) => {
            debug!("TunnelSrv dropping undecodable base64 query err = {e:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::server::request::{TunnelAction, TunnelRequest};

    #[test]
    fn test_plain_fields() {
        let body = b"login=root&password=secret&host=127.0.0.1&port=3306&db=shop&actn=C";
        let request = TunnelRequest::from_form(body);
        assert_eq!(request.user, "root");
        assert_eq!(request.password, "secret");
        assert_eq!(request.backend_addr(), "127.0.0.1:3306");
        assert_eq!(request.database, "shop");
        assert_eq!(request.action, TunnelAction::ConnectProbe);
        assert!(request.queries.is_empty());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let request = TunnelRequest::from_form(b"actn=Q");
        assert_eq!(request.user, "");
        assert_eq!(request.database, "");
        assert_eq!(request.backend_addr(), ":");
        assert_eq!(request.action, TunnelAction::QueryBatch);
    }

    #[test]
    fn test_unknown_action_is_other() {
        let request = TunnelRequest::from_form(b"actn=X");
        assert_eq!(request.action, TunnelAction::Other);
    }

    #[test]
    fn test_queries_keep_transmission_order() {
        let body = b"actn=Q&q[]=SELECT+1&q[]=&q[]=SELECT+2";
        let request = TunnelRequest::from_form(body);
        assert_eq!(request.queries, vec!["SELECT 1", "", "SELECT 2"]);
    }

    #[test]
    fn test_base64_with_padding_repair() {
        // "SELECT 1" encodes to "U0VMRUNUIDE=": send it without padding.
        let body = b"actn=Q&encodeBase64=1&q[]=U0VMRUNUIDE";
        let request = TunnelRequest::from_form(body);
        assert_eq!(request.queries, vec!["SELECT 1"]);
    }

    #[test]
    fn test_base64_flag_before_or_after_queries() {
        let body = b"q[]=U0VMRUNUIDE%3D&encodeBase64=1";
        let request = TunnelRequest::from_form(body);
        assert_eq!(request.queries, vec!["SELECT 1"]);
    }

    #[test]
    fn test_invalid_base64_query_is_dropped() {
        let body = b"encodeBase64=1&q[]=%21%21%21%21&q[]=U0VMRUNUIDE";
        let request = TunnelRequest::from_form(body);
        assert_eq!(request.queries, vec!["SELECT 1"]);
    }

    #[test]
    fn test_non_utf8_base64_query_is_dropped() {
        // "//4" pads to "//4=" and decodes to 0xFF 0xFE, which no query
        // string can carry
        let body = b"encodeBase64=1&q[]=%2F%2F4&q[]=U0VMRUNUIDE";
        let request = TunnelRequest::from_form(body);
        assert_eq!(request.queries, vec!["SELECT 1"]);
    }

    #[test]
    fn test_base64_disabled_keeps_raw_queries() {
        let body = b"encodeBase64=0&q[]=U0VMRUNUIDE";
        let request = TunnelRequest::from_form(body);
        assert_eq!(request.queries, vec!["U0VMRUNUIDE"]);
    }
}
