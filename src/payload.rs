/// Payload formatting.
///
/// Turns a typed [`ContentInput`] into the exact string a QR reader expects for each
/// content scheme: plain text, web URLs, `mailto:`, `tel:`, `WIFI:` and vCard 3.0.
///
/// Formatting is total. Empty fields produce empty segments or are left out, they
/// never produce an error. Reserved characters (`;`, `:`, `\`) inside Wi-Fi and vCard
/// fields are emitted as given.
use std::fmt;
use std::str::FromStr;

/// The kind of content being encoded, one per input form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    #[default]
    Text,
    Url,
    Email,
    Phone,
    Wifi,
    VCard,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::Text,
        ContentType::Url,
        ContentType::Email,
        ContentType::Phone,
        ContentType::Wifi,
        ContentType::VCard,
    ];

    /// The lowercase tag used on the command line and in `live` events.
    pub fn tag(self) -> &'static str {
        use ContentType::*;
        match self {
            Text => "text",
            Url => "url",
            Email => "email",
            Phone => "phone",
            Wifi => "wifi",
            VCard => "vcard",
        }
    }

    /// Human readable label shown in the preview info.
    pub fn label(self) -> &'static str {
        use ContentType::*;
        match self {
            Text => "Text",
            Url => "Website URL",
            Email => "Email",
            Phone => "Phone Number",
            Wifi => "Wi-Fi Network",
            VCard => "Contact Card",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| format!("unknown content type: {s}"))
    }
}

/// One snapshot of the active input form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentInput {
    Text {
        text: String,
    },
    Url {
        url: String,
    },
    Email {
        email: String,
        subject: String,
        body: String,
    },
    Phone {
        phone: String,
    },
    Wifi {
        ssid: String,
        password: String,
        security: String,
    },
    VCard {
        first_name: String,
        last_name: String,
        org: String,
        phone: String,
        email: String,
        url: String,
    },
}

impl ContentInput {
    pub fn content_type(&self) -> ContentType {
        match self {
            ContentInput::Text { .. } => ContentType::Text,
            ContentInput::Url { .. } => ContentType::Url,
            ContentInput::Email { .. } => ContentType::Email,
            ContentInput::Phone { .. } => ContentType::Phone,
            ContentInput::Wifi { .. } => ContentType::Wifi,
            ContentInput::VCard { .. } => ContentType::VCard,
        }
    }
}

/// Formats `input` into the payload string embedded in the QR symbol.
///
/// # Example
///
/// ```
/// use qistudio::payload::{format, ContentInput};
///
/// let payload = format(&ContentInput::Url { url: "example.com".into() });
/// assert_eq!(payload, "https://example.com");
/// ```
pub fn format(input: &ContentInput) -> String {
    match input {
        ContentInput::Text { text } => text.clone(),
        ContentInput::Url { url } => format_url(url),
        ContentInput::Email {
            email,
            subject,
            body,
        } => format_email(email, subject, body),
        ContentInput::Phone { phone } => format_phone(phone),
        ContentInput::Wifi {
            ssid,
            password,
            security,
        } => format_wifi(ssid, password, security),
        ContentInput::VCard {
            first_name,
            last_name,
            org,
            phone,
            email,
            url,
        } => format_vcard(first_name, last_name, org, phone, email, url),
    }
}

pub fn format_url(url: &str) -> String {
    if url.is_empty() {
        String::new()
    } else if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

pub fn format_email(email: &str, subject: &str, body: &str) -> String {
    let mut out = format!("mailto:{email}");
    let mut params = Vec::with_capacity(2);
    if !subject.is_empty() {
        params.push(format!("subject={}", urlencoding::encode(subject)));
    }
    if !body.is_empty() {
        params.push(format!("body={}", urlencoding::encode(body)));
    }
    if !params.is_empty() {
        out.push('?');
        out.push_str(&params.join("&"));
    }
    out
}

pub fn format_phone(phone: &str) -> String {
    format!("tel:{phone}")
}

pub fn format_wifi(ssid: &str, password: &str, security: &str) -> String {
    format!("WIFI:T:{security};S:{ssid};P:{password};H:false;")
}

pub fn format_vcard(
    first_name: &str,
    last_name: &str,
    org: &str,
    phone: &str,
    email: &str,
    url: &str,
) -> String {
    let mut lines = vec!["BEGIN:VCARD".to_string(), "VERSION:3.0".to_string()];

    if !first_name.is_empty() || !last_name.is_empty() {
        lines.push(format!("FN:{first_name} {last_name}"));
        lines.push(format!("N:{last_name};{first_name};;;"));
    }
    for (key, value) in [("ORG", org), ("TEL", phone), ("EMAIL", email), ("URL", url)] {
        if !value.is_empty() {
            lines.push(format!("{key}:{value}"));
        }
    }

    lines.push("END:VCARD".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vcard(first: &str, last: &str) -> ContentInput {
        ContentInput::VCard {
            first_name: first.into(),
            last_name: last.into(),
            org: String::new(),
            phone: String::new(),
            email: String::new(),
            url: String::new(),
        }
    }

    #[test]
    fn test_text_passthrough() {
        assert_eq!(format(&ContentInput::Text { text: "".into() }), "");
        assert_eq!(
            format(&ContentInput::Text {
                text: "Welcome to QR Generator Pro!".into()
            }),
            "Welcome to QR Generator Pro!"
        );
    }

    #[test]
    fn test_url_normalization() {
        assert_eq!(format(&ContentInput::Url { url: "".into() }), "");
        assert_eq!(
            format(&ContentInput::Url {
                url: "example.com".into()
            }),
            "https://example.com"
        );
        assert_eq!(
            format(&ContentInput::Url {
                url: "http://x.com".into()
            }),
            "http://x.com"
        );
        // Only the `http` prefix is checked.
        assert_eq!(format_url("httpbin.org"), "httpbin.org");
    }

    #[test]
    fn test_email_params() {
        let input = ContentInput::Email {
            email: "a@b.com".into(),
            subject: "Hi".into(),
            body: "".into(),
        };
        assert_eq!(format(&input), "mailto:a@b.com?subject=Hi");
        assert_eq!(format_email("a@b.com", "", ""), "mailto:a@b.com");
        assert_eq!(format_email("a@b.com", "", "Yo"), "mailto:a@b.com?body=Yo");
        assert_eq!(
            format_email("a@b.com", "Hello there", "a&b"),
            "mailto:a@b.com?subject=Hello%20there&body=a%26b"
        );
    }

    #[test]
    fn test_phone_as_given() {
        assert_eq!(format_phone("+1 (555) 010-0000"), "tel:+1 (555) 010-0000");
        assert_eq!(format_phone(""), "tel:");
    }

    #[test]
    fn test_wifi_exact() {
        let input = ContentInput::Wifi {
            ssid: "Home".into(),
            password: "secret".into(),
            security: "WPA".into(),
        };
        assert_eq!(format(&input), "WIFI:T:WPA;S:Home;P:secret;H:false;");
        assert_eq!(format_wifi("", "", ""), "WIFI:T:;S:;P:;H:false;");
    }

    #[test]
    fn test_wifi_reserved_characters_not_escaped() {
        assert_eq!(
            format_wifi("a;b", "c:d", "WEP"),
            "WIFI:T:WEP;S:a;b;P:c:d;H:false;"
        );
    }

    #[test]
    fn test_vcard_first_name_only() {
        assert_eq!(
            format(&vcard("A", "")),
            "BEGIN:VCARD\nVERSION:3.0\nFN:A \nN:;A;;;\nEND:VCARD"
        );
    }

    #[test]
    fn test_vcard_last_name_only() {
        assert_eq!(
            format(&vcard("", "B")),
            "BEGIN:VCARD\nVERSION:3.0\nFN: B\nN:B;;;;\nEND:VCARD"
        );
    }

    #[test]
    fn test_vcard_empty() {
        assert_eq!(format(&vcard("", "")), "BEGIN:VCARD\nVERSION:3.0\nEND:VCARD");
    }

    #[test]
    fn test_vcard_all_fields_in_order() {
        let input = ContentInput::VCard {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            org: "Engines".into(),
            phone: "+44 20".into(),
            email: "ada@example.com".into(),
            url: "https://ada.dev".into(),
        };
        assert_eq!(
            format(&input),
            "BEGIN:VCARD\nVERSION:3.0\nFN:Ada Lovelace\nN:Lovelace;Ada;;;\nORG:Engines\n\
             TEL:+44 20\nEMAIL:ada@example.com\nURL:https://ada.dev\nEND:VCARD"
        );
    }

    #[test]
    fn test_content_type_tags() {
        for kind in ContentType::ALL {
            assert_eq!(kind.tag().parse::<ContentType>(), Ok(kind));
        }
        assert!("barcode".parse::<ContentType>().is_err());
        assert_eq!(ContentType::Wifi.label(), "Wi-Fi Network");
    }
}
