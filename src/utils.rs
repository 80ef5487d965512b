use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// URLs and mail addresses carry no language signal and are replaced by a
    /// single space before text enters the detection buffer.
    pub static ref RE_URL: Regex = Regex::new(r"https?://[-_.?&~;+=/#0-9A-Za-z]{1,2076}")
        .expect("Error compiling URL regex");
    pub static ref RE_MAIL: Regex =
        Regex::new(r"[-_.0-9A-Za-z]{1,64}@[-_0-9A-Za-z]{1,255}[-_.0-9A-Za-z]{1,255}")
            .expect("Error compiling mail regex");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_strip() {
        assert_eq!(
            RE_URL.replace_all("see https://example.com/foo?a=1 here", " "),
            "see   here"
        );
        assert_eq!(RE_URL.replace_all("http://t.co/x", " "), " ");
    }

    #[test]
    fn test_mail_strip() {
        assert_eq!(
            RE_MAIL.replace_all("write to john.doe@example.org today", " "),
            "write to   today"
        );
    }

    #[test]
    fn test_strip_idempotent() {
        let once = RE_URL
            .replace_all("x https://a.example/b y", " ")
            .into_owned();
        assert_eq!(RE_URL.replace_all(&once, " "), once);
    }
}
