// UPnP ContentDirectory client
// Service definition: http://upnp.org/specs/av/UPnP-av-ContentDirectory-v1-Service.pdf
// Only the Browse action is implemented; discovery is done through a configured
// device description or control URL, not SSDP.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use url::Url;

use crate::error::DirectoryError;
use crate::models::ContentNode;

const CONTENT_DIRECTORY_SERVICE: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";

static RE_DIDL_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(container|item)\b([^>]*?)(?:/>|>(.*?)</(?:container|item)>)").unwrap()
});
static RE_ATTR_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)id\s*=\s*"([^"]*)""#).unwrap());
static RE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<dc:title[^>]*>(.*?)</dc:title>").unwrap());
static RE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<upnp:class[^>]*>(.*?)</upnp:class>").unwrap());
static RE_RES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<res\b[^>]*>(.*?)</res>").unwrap());
static RE_SERVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<service>(.*?)</service>").unwrap());

/// Anything that can list the direct children of a content directory node
#[async_trait]
pub trait ContentDirectory: Send + Sync {
    async fn browse_children(&self, object_id: &str) -> Result<Vec<ContentNode>, DirectoryError>;
}

/// HTTP/SOAP client bound to one ContentDirectory control URL
pub struct UpnpClient {
    client: Client,
    control_url: String,
}

impl UpnpClient {
    pub fn new(control_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            control_url: control_url.into(),
        }
    }

    /// Build a client from a device description URL (the LOCATION header a media server
    /// advertises), looking up the ContentDirectory control URL in it
    pub async fn from_description(description_url: &str) -> Result<Self, DirectoryError> {
        let client = Client::new();
        let response = client.get(description_url).send().await?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status()));
        }
        let xml = response.text().await?;
        let control_url = find_control_url(&xml, description_url)?;

        tracing::info!("ContentDirectory control URL: {}", control_url);

        Ok(Self {
            client,
            control_url,
        })
    }

    pub fn control_url(&self) -> &str {
        &self.control_url
    }
}

#[async_trait]
impl ContentDirectory for UpnpClient {
    async fn browse_children(&self, object_id: &str) -> Result<Vec<ContentNode>, DirectoryError> {
        tracing::debug!("Browsing '{}'", object_id);

        let response = self
            .client
            .post(&self.control_url)
            .header("Content-Type", r#"text/xml; charset="utf-8""#)
            .header(
                "SOAPAction",
                format!("\"{}#Browse\"", CONTENT_DIRECTORY_SERVICE),
            )
            .body(browse_request_body(object_id))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Faults come back as HTTP 500 with a SOAP body
        if let Some(fault) = parse_fault(&body) {
            return Err(fault);
        }
        if !status.is_success() {
            return Err(DirectoryError::Status(status));
        }

        parse_browse_response(&body)
    }
}

/// SOAP envelope for BrowseDirectChildren with no paging limit
fn browse_request_body(object_id: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">"#,
            r#"<s:Body><u:Browse xmlns:u="{}">"#,
            "<ObjectID>{}</ObjectID>",
            "<BrowseFlag>BrowseDirectChildren</BrowseFlag>",
            "<Filter>*</Filter>",
            "<StartingIndex>0</StartingIndex>",
            "<RequestedCount>0</RequestedCount>",
            "<SortCriteria></SortCriteria>",
            "</u:Browse></s:Body></s:Envelope>"
        ),
        CONTENT_DIRECTORY_SERVICE,
        xml_escape(object_id)
    )
}

/// Extract and decode the DIDL-Lite payload of a BrowseResponse, then classify its nodes
pub fn parse_browse_response(body: &str) -> Result<Vec<ContentNode>, DirectoryError> {
    let result = extract_element(body, "Result")
        .ok_or_else(|| DirectoryError::Parse("missing <Result> element".to_string()))?;

    let didl = xml_decode(result);
    if didl.trim().is_empty() {
        return Ok(Vec::new());
    }
    if !didl.contains("<DIDL-Lite") {
        return Err(DirectoryError::Parse(
            "<Result> does not contain a DIDL-Lite document".to_string(),
        ));
    }

    parse_didl(&didl)
}

/// Classify every container/item in a DIDL-Lite document
pub fn parse_didl(didl: &str) -> Result<Vec<ContentNode>, DirectoryError> {
    let mut nodes = Vec::new();

    for caps in RE_DIDL_NODE.captures_iter(didl) {
        let element = &caps[1];
        let attrs = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let inner = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

        let id = RE_ATTR_ID
            .captures(attrs)
            .map(|c| xml_decode(&c[1]))
            .ok_or_else(|| DirectoryError::Parse(format!("<{}> without id attribute", element)))?;

        let title = RE_TITLE
            .captures(inner)
            .map(|c| xml_decode(c[1].trim()))
            .unwrap_or_default();

        let class = RE_CLASS
            .captures(inner)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default();

        let node = if element == "container" || class.starts_with("object.container") {
            ContentNode::Folder { id, title }
        } else if class.starts_with("object.item.videoItem") {
            // Primary resource is the first <res>
            match RE_RES.captures(inner).map(|c| xml_decode(c[1].trim())) {
                Some(media_url) if !media_url.is_empty() => ContentNode::VideoLeaf {
                    id,
                    title,
                    media_url,
                },
                _ => {
                    tracing::debug!("Video item '{}' has no resource URL, skipping", title);
                    ContentNode::Other { id, title }
                }
            }
        } else {
            ContentNode::Other { id, title }
        };

        nodes.push(node);
    }

    Ok(nodes)
}

/// Decode a SOAP fault into a DirectoryError, if the body is one
fn parse_fault(body: &str) -> Option<DirectoryError> {
    if !body.contains("Fault>") {
        return None;
    }
    let code = extract_element(body, "errorCode")
        .map(|c| c.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let description = extract_element(body, "errorDescription")
        .or_else(|| extract_element(body, "faultstring"))
        .map(|d| xml_decode(d.trim()))
        .unwrap_or_default();
    Some(DirectoryError::Fault { code, description })
}

/// Find the ContentDirectory controlURL in a device description and make it absolute
pub fn find_control_url(description: &str, description_url: &str) -> Result<String, DirectoryError> {
    let control = RE_SERVICE
        .captures_iter(description)
        .filter_map(|caps| {
            let service = caps.get(1)?.as_str();
            let service_type = extract_element(service, "serviceType")?;
            if service_type.contains("ContentDirectory") {
                extract_element(service, "controlURL").map(|u| xml_decode(u.trim()))
            } else {
                None
            }
        })
        .next()
        .ok_or_else(|| {
            DirectoryError::Parse("device description has no ContentDirectory service".to_string())
        })?;

    let base = extract_element(description, "URLBase")
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| description_url.to_string());

    let base = Url::parse(&base)
        .map_err(|e| DirectoryError::Parse(format!("invalid base URL '{}': {}", base, e)))?;
    let resolved = base
        .join(&control)
        .map_err(|e| DirectoryError::Parse(format!("invalid controlURL '{}': {}", control, e)))?;

    Ok(resolved.to_string())
}

/// Inner text of the first element with this local name, ignoring any namespace prefix
fn extract_element<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let mut search_from = 0;
    while let Some(offset) = xml[search_from..].find(name) {
        let pos = search_from + offset;
        search_from = pos + name.len();

        // Must be an opening tag: "<name" or "<prefix:name", followed by '>' or whitespace
        let before = &xml[..pos];
        let Some(lt) = before.rfind('<') else {
            continue;
        };
        let prefix = &before[lt + 1..];
        if !(prefix.is_empty() || prefix.ends_with(':'))
            || prefix.contains(|c: char| c.is_whitespace() || c == '>' || c == '/')
        {
            continue;
        }
        let after = &xml[search_from..];
        let gt = after.find('>')?;
        let attrs = &after[..gt];
        if !(attrs.is_empty() || attrs == "/" || attrs.starts_with(char::is_whitespace)) {
            continue;
        }
        if attrs.ends_with('/') {
            return Some("");
        }

        let content_start = search_from + gt + 1;
        let close = format!("</{}{}>", prefix, name);
        let end = xml[content_start..].find(&close)?;
        return Some(&xml[content_start..content_start + end]);
    }
    None
}

/// Decode the five predefined XML entities plus numeric character references.
/// `&amp;` goes last so "&amp;lt;" decodes to "&lt;" and not "<".
fn xml_decode(s: &str) -> String {
    let mut decoded = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let parsed = tail
            .find(';')
            .and_then(|end| decode_entity(&tail[..end]).map(|c| (c, end)));
        match parsed {
            Some((c, end)) => {
                decoded.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                decoded.push('&');
                rest = tail;
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

/// Resolve the body of one `&...;` reference
fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browse_response(didl: &str) -> String {
        let escaped = xml_escape(didl);
        format!(
            r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
<s:Body><u:BrowseResponse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">
<Result>{}</Result>
<NumberReturned>2</NumberReturned><TotalMatches>2</TotalMatches><UpdateID>1</UpdateID>
</u:BrowseResponse></s:Body></s:Envelope>"#,
            escaped
        )
    }

    const DIDL: &str = r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/">
<container id="64$1" parentID="64" restricted="1" childCount="3"><dc:title>Movies</dc:title><upnp:class>object.container.storageFolder</upnp:class></container>
<item id="64$2" parentID="64" restricted="1"><dc:title>Tom &amp; Jerry.S01E01.mkv</dc:title><upnp:class>object.item.videoItem</upnp:class><res protocolInfo="http-get:*:video/x-matroska:*">http://192.168.1.10:8200/MediaItems/22.mkv</res><res protocolInfo="http-get:*:image/jpeg:*">http://192.168.1.10:8200/Thumbs/22.jpg</res></item>
<item id="64$3" parentID="64" restricted="1"><dc:title>song.mp3</dc:title><upnp:class>object.item.audioItem.musicTrack</upnp:class><res>http://192.168.1.10:8200/MediaItems/23.mp3</res></item>
</DIDL-Lite>"#;

    #[test]
    fn test_parse_browse_response() {
        let nodes = parse_browse_response(&browse_response(DIDL)).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(
            nodes[0],
            ContentNode::Folder {
                id: "64$1".to_string(),
                title: "Movies".to_string()
            }
        );
        assert_eq!(
            nodes[1],
            ContentNode::VideoLeaf {
                id: "64$2".to_string(),
                title: "Tom & Jerry.S01E01.mkv".to_string(),
                media_url: "http://192.168.1.10:8200/MediaItems/22.mkv".to_string()
            }
        );
        assert!(matches!(nodes[2], ContentNode::Other { .. }));
    }

    #[test]
    fn test_empty_children_is_not_an_error() {
        let didl = r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/"></DIDL-Lite>"#;
        assert!(parse_browse_response(&browse_response(didl)).unwrap().is_empty());
        assert!(parse_browse_response(&browse_response("")).unwrap().is_empty());
    }

    #[test]
    fn test_missing_result_is_parse_error() {
        let body = "<s:Envelope><s:Body><u:BrowseResponse></u:BrowseResponse></s:Body></s:Envelope>";
        assert!(matches!(
            parse_browse_response(body),
            Err(DirectoryError::Parse(_))
        ));
    }

    #[test]
    fn test_node_without_id_is_parse_error() {
        let didl = r#"<DIDL-Lite><item parentID="0"><dc:title>x</dc:title><upnp:class>object.item.videoItem</upnp:class><res>http://x</res></item></DIDL-Lite>"#;
        assert!(matches!(parse_didl(didl), Err(DirectoryError::Parse(_))));
    }

    #[test]
    fn test_video_without_resource_is_other() {
        let didl = r#"<DIDL-Lite><item id="9"><dc:title>broken.mkv</dc:title><upnp:class>object.item.videoItem.movie</upnp:class></item></DIDL-Lite>"#;
        let nodes = parse_didl(didl).unwrap();
        assert!(matches!(nodes[0], ContentNode::Other { .. }));
    }

    #[test]
    fn test_parse_fault() {
        let body = r#"<s:Envelope><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring><detail><UPnPError xmlns="urn:schemas-upnp-org:control-1-0"><errorCode>701</errorCode><errorDescription>No such object</errorDescription></UPnPError></detail></s:Fault></s:Body></s:Envelope>"#;
        match parse_fault(body) {
            Some(DirectoryError::Fault { code, description }) => {
                assert_eq!(code, "701");
                assert_eq!(description, "No such object");
            }
            other => panic!("expected fault, got {:?}", other),
        }
        assert!(parse_fault(&browse_response(DIDL)).is_none());
    }

    #[test]
    fn test_find_control_url() {
        let description = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
<device><serviceList>
<service><serviceType>urn:schemas-upnp-org:service:ConnectionManager:1</serviceType><controlURL>/ctl/ConnectionMgr</controlURL></service>
<service><serviceType>urn:schemas-upnp-org:service:ContentDirectory:1</serviceType><controlURL>/ctl/ContentDir</controlURL></service>
</serviceList></device></root>"#;
        let url = find_control_url(description, "http://192.168.1.10:8200/rootDesc.xml").unwrap();
        assert_eq!(url, "http://192.168.1.10:8200/ctl/ContentDir");
    }

    #[test]
    fn test_find_control_url_uses_url_base() {
        let description = r#"<root><URLBase>http://10.0.0.2:9000/</URLBase><device><serviceList>
<service><serviceType>urn:schemas-upnp-org:service:ContentDirectory:1</serviceType><controlURL>cd/control</controlURL></service>
</serviceList></device></root>"#;
        let url = find_control_url(description, "http://10.0.0.2:1234/desc.xml").unwrap();
        assert_eq!(url, "http://10.0.0.2:9000/cd/control");
    }

    #[test]
    fn test_extract_element() {
        let xml = "<a><TotalResult>9</TotalResult><u:Result>ok</u:Result><Empty/></a>";
        assert_eq!(extract_element(xml, "Result"), Some("ok"));
        assert_eq!(extract_element(xml, "Empty"), Some(""));
        assert_eq!(extract_element(xml, "Missing"), None);
    }

    #[test]
    fn test_xml_decode() {
        assert_eq!(xml_decode("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(xml_decode("a &lt; b"), "a < b");
        assert_eq!(xml_decode("&amp;lt;"), "&lt;");
        assert_eq!(xml_decode("caf&#233; &#x41;"), "café A");
        assert_eq!(xml_decode("&#bogus"), "&#bogus");
    }

    #[test]
    fn test_xml_decode_single_pass() {
        // The decoded '&' must not start a second reference
        assert_eq!(xml_decode("&#38;lt;"), "&lt;");
        assert_eq!(xml_decode("&#x26;amp;"), "&amp;");
        assert_eq!(xml_decode("Fast & Furious; Tokyo"), "Fast & Furious; Tokyo");
        assert_eq!(xml_decode("&nbsp;x"), "&nbsp;x");
    }

    #[test]
    fn test_browse_request_escapes_object_id() {
        let body = browse_request_body("64$<1>");
        assert!(body.contains("<ObjectID>64$&lt;1&gt;</ObjectID>"));
        assert!(body.contains("<BrowseFlag>BrowseDirectChildren</BrowseFlag>"));
        assert!(body.contains("<RequestedCount>0</RequestedCount>"));
    }
}
