//! Cascading comment-body parser.
//!
//! Comments on a battle thread usually carry one markdown link to the
//! entrant's image. Three matcher tiers run in order, first match wins:
//! a direct file link, an imgur album, then any other imgur page. Bodies
//! with no markdown link at all are dropped — a recall limitation, not an
//! error.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::imgur::ImgurLookup;

/// A markdown link extracted from a comment body, before any indirect-host
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLink {
    pub text: String,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Link already points at an image/video file.
    Direct(String),
    /// imgur album hash, needs an album lookup.
    Album(String),
    /// imgur page hash, needs a single-image lookup.
    Image(String),
}

/// A caption plus a directly fetchable URL, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPhoto {
    pub text: String,
    pub url: String,
}

static DIRECT_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]*)\]\((https?://[^)\s]+\.(?:jpg|jpeg|png|gif|mp4))\)").unwrap()
});

static IMGUR_ALBUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]*)\]\(https?://(?:www\.|m\.)?imgur\.com/(?:a|gallery)/([A-Za-z0-9]+)[^)\s]*\)")
        .unwrap()
});

static IMGUR_PAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]*)\]\(https?://(?:www\.|m\.)?imgur\.com/([A-Za-z0-9]+)[^)\s]*\)").unwrap()
});

fn direct_file(body: &str) -> Option<CommentLink> {
    let caps = DIRECT_FILE.captures(body)?;
    Some(CommentLink {
        text: caps[1].to_string(),
        target: Target::Direct(caps[2].to_string()),
    })
}

fn imgur_album(body: &str) -> Option<CommentLink> {
    let caps = IMGUR_ALBUM.captures(body)?;
    Some(CommentLink {
        text: caps[1].to_string(),
        target: Target::Album(caps[2].to_string()),
    })
}

fn imgur_page(body: &str) -> Option<CommentLink> {
    let caps = IMGUR_PAGE.captures(body)?;
    Some(CommentLink {
        text: caps[1].to_string(),
        target: Target::Image(caps[2].to_string()),
    })
}

/// Ordered matcher tiers; precedence is the array order.
const TIERS: &[fn(&str) -> Option<CommentLink>] = &[direct_file, imgur_album, imgur_page];

/// Extract the best markdown link from a comment body, trying each tier in
/// order and short-circuiting on the first match.
pub fn parse_comment(body: &str) -> Option<CommentLink> {
    TIERS.iter().find_map(|tier| tier(body))
}

/// Resolve a comment body to an uploadable (caption, url) pair, consulting
/// the indirect host for album/page targets. `None` means the comment is
/// skipped: no link, unsupported host, or a failed lookup.
pub async fn resolve_comment(body: &str, imgur: &dyn ImgurLookup) -> Option<ResolvedPhoto> {
    let link = parse_comment(body)?;
    let url = match link.target {
        Target::Direct(url) => url,
        Target::Album(hash) => imgur.album(&hash).await?,
        Target::Image(hash) => imgur.image(&hash).await?,
    };
    Some(ResolvedPhoto {
        text: link.text,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubImgur;

    #[async_trait]
    impl ImgurLookup for StubImgur {
        async fn image(&self, hash: &str) -> Option<String> {
            Some(format!("https://i.imgur.com/{hash}.jpg"))
        }

        async fn album(&self, _hash: &str) -> Option<String> {
            Some("https://i.imgur.com/first.png".into())
        }
    }

    struct FailingImgur;

    #[async_trait]
    impl ImgurLookup for FailingImgur {
        async fn image(&self, _hash: &str) -> Option<String> {
            None
        }

        async fn album(&self, _hash: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn direct_file_link_extracted() {
        let link = parse_comment("[cool edit](http://x/a.png)").unwrap();
        assert_eq!(link.text, "cool edit");
        assert_eq!(link.target, Target::Direct("http://x/a.png".into()));
    }

    #[test]
    fn direct_file_beats_album() {
        let body = "[album](http://imgur.com/a/ABC123) and [file](http://x/b.jpg)";
        let link = parse_comment(body).unwrap();
        assert_eq!(link.target, Target::Direct("http://x/b.jpg".into()));
    }

    #[test]
    fn album_link_extracts_hash() {
        let link = parse_comment("[nice](http://imgur.com/a/ABC123)").unwrap();
        assert_eq!(link.target, Target::Album("ABC123".into()));

        let link = parse_comment("[g](https://imgur.com/gallery/74LLAyk)").unwrap();
        assert_eq!(link.target, Target::Album("74LLAyk".into()));
    }

    #[test]
    fn bare_imgur_page_extracts_hash() {
        let link = parse_comment("[mine](https://imgur.com/dJx4fQl)").unwrap();
        assert_eq!(link.text, "mine");
        assert_eq!(link.target, Target::Image("dJx4fQl".into()));
    }

    #[test]
    fn album_beats_bare_page() {
        let body = "[p](https://imgur.com/dJx4fQl) then [a](https://imgur.com/a/ABC123)";
        let link = parse_comment(body).unwrap();
        assert_eq!(link.target, Target::Album("ABC123".into()));
    }

    #[test]
    fn no_markdown_link_is_empty() {
        assert_eq!(parse_comment("just a plain comment"), None);
        assert_eq!(parse_comment("bare url http://x/a.png"), None);
        assert_eq!(parse_comment("[other host](http://example.com/page)"), None);
    }

    #[tokio::test]
    async fn direct_link_needs_no_lookup() {
        // FailingImgur proves the resolver never consults the host for tier 1.
        let resolved = resolve_comment("[cool edit](http://x/a.png)", &FailingImgur)
            .await
            .unwrap();
        assert_eq!(resolved.text, "cool edit");
        assert_eq!(resolved.url, "http://x/a.png");
    }

    #[tokio::test]
    async fn album_resolves_to_first_image() {
        let resolved = resolve_comment("[nice](http://imgur.com/a/ABC123)", &StubImgur)
            .await
            .unwrap();
        assert_eq!(resolved.text, "nice");
        assert_eq!(resolved.url, "https://i.imgur.com/first.png");
    }

    #[tokio::test]
    async fn failed_lookup_skips_comment() {
        let resolved = resolve_comment("[nice](http://imgur.com/a/ABC123)", &FailingImgur).await;
        assert_eq!(resolved, None);
        let resolved = resolve_comment("[p](https://imgur.com/dJx4fQl)", &FailingImgur).await;
        assert_eq!(resolved, None);
    }
}
