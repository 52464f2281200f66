use std::fmt;

use aliri_braid::braid;

/// Hides a secret unless the alternate format is requested
///
/// `{:?}` and `{}` print only a placeholder. `{:#?}` reveals a prefix of the
/// secret, `{:#}` reveals it in full. In either alternate form, a width
/// caps the number of characters shown.
macro_rules! limited_reveal {
    ($ty:ty: $hidden:literal, $default:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    limited_reveal(self.as_str(), &mut *f, $default)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    limited_reveal(self.as_str(), &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }
    };
}

fn limited_reveal(secret: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > secret.len() {
        f.write_str(secret)
    } else {
        match secret.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < secret.len() => {
                f.write_str(&secret[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(secret),
        }
    }
}

/// An OAuth2 client ID
#[braid(serde)]
pub struct ClientId;

/// An OAuth2 client secret
#[braid(serde, debug = "owned", display = "owned")]
pub struct ClientSecret;

limited_reveal!(ClientSecretRef: "CLIENT SECRET", 5);

/// A bearer access token as issued by the authorization server
///
/// The token is opaque to the acquirer; it is only ever presented to a
/// resource server.
#[braid(serde, debug = "owned", display = "owned")]
pub struct AccessToken;

limited_reveal!(AccessTokenRef: "ACCESS TOKEN", 15);
