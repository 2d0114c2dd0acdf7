//! Wire format of the hosting API and its endpoints.
//!
//! Responses are decoded here and normalized into `pooldl-core` types; no
//! other module looks at raw JSON.

use serde::Deserialize;

use pooldl_core::{PoolId, PoolSummary, PostId, PostRecord};

use crate::error::{upstream_err, SyncError};

/// Endpoint URLs below one API root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /pools.json?search[id]={id}`
    pub fn pool(&self, id: PoolId) -> String {
        format!("{}/pools.json?search[id]={id}", self.base)
    }

    /// `GET /posts.json?tags=id:{id}`
    pub fn post(&self, id: PostId) -> String {
        format!("{}/posts.json?tags=id:{id}", self.base)
    }

    /// `GET /posts.json?tags=id:{a,b,c}&limit={n}`
    pub fn posts(&self, ids: &[PostId]) -> String {
        let joined = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/posts.json?tags=id:{joined}&limit={}",
            self.base,
            ids.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Pool lookup
// ---------------------------------------------------------------------------

/// The pool endpoint answers with either a bare object or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PoolResponse {
    List(Vec<PoolPayload>),
    Single(PoolPayload),
}

#[derive(Debug, Deserialize)]
struct PoolPayload {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    post_count: Option<u64>,
    #[serde(default)]
    post_ids: Vec<u64>,
}

/// Decode a pool lookup. `Ok(None)` means the pool does not exist or has no
/// posts.
pub(crate) fn decode_pool(
    url: &str,
    requested: PoolId,
    body: &[u8],
) -> Result<Option<PoolSummary>, SyncError> {
    let response: PoolResponse = serde_json::from_slice(body).map_err(|e| upstream_err(url, e))?;
    let payload = match response {
        PoolResponse::Single(p) => Some(p),
        PoolResponse::List(list) if list.len() == 1 => list.into_iter().next(),
        PoolResponse::List(list) => list.into_iter().find(|p| p.id == Some(requested.0)),
    };
    let Some(payload) = payload else {
        return Ok(None);
    };
    if payload.post_ids.is_empty() {
        return Ok(None);
    }

    let name = payload
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| requested.to_string());
    let post_ids: Vec<PostId> = payload.post_ids.into_iter().map(PostId).collect();
    Ok(Some(PoolSummary {
        id: requested,
        name,
        image_count: payload.post_count.unwrap_or(post_ids.len() as u64),
        post_ids,
    }))
}

// ---------------------------------------------------------------------------
// Post lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PostsResponse {
    posts: Vec<PostPayload>,
}

#[derive(Debug, Deserialize)]
struct PostPayload {
    id: u64,
    #[serde(default)]
    file: Option<FilePayload>,
}

#[derive(Debug, Default, Deserialize)]
struct FilePayload {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    md5: Option<String>,
    #[serde(default)]
    ext: Option<String>,
}

impl From<PostPayload> for PostRecord {
    fn from(p: PostPayload) -> Self {
        let file = p.file.unwrap_or_default();
        PostRecord {
            id: PostId(p.id),
            file_url: file.url,
            md5: file.md5,
            extension: file.ext,
        }
    }
}

/// Decode a `posts.json` response into records, in response order.
pub(crate) fn decode_posts(url: &str, body: &[u8]) -> Result<Vec<PostRecord>, SyncError> {
    let response: PostsResponse = serde_json::from_slice(body).map_err(|e| upstream_err(url, e))?;
    Ok(response.posts.into_iter().map(PostRecord::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://api/pools.json";

    #[test]
    fn endpoint_urls() {
        let e = Endpoints::new("https://e621.net/");
        assert_eq!(e.pool(PoolId(7)), "https://e621.net/pools.json?search[id]=7");
        assert_eq!(e.post(PostId(9)), "https://e621.net/posts.json?tags=id:9");
        assert_eq!(
            e.posts(&[PostId(1), PostId(2), PostId(3)]),
            "https://e621.net/posts.json?tags=id:1,2,3&limit=3"
        );
    }

    #[test]
    fn pool_as_bare_object() {
        let body = br#"{"id":7,"name":"My_Pool","post_count":3,"post_ids":[501,502,503]}"#;
        let pool = decode_pool(URL, PoolId(7), body).unwrap().expect("pool");
        assert_eq!(pool.name, "My_Pool");
        assert_eq!(pool.image_count, 3);
        assert_eq!(pool.post_ids, vec![PostId(501), PostId(502), PostId(503)]);
    }

    #[test]
    fn pool_as_single_element_list() {
        let body = br#"[{"id":7,"name":"My_Pool","post_count":2,"post_ids":[2,1]}]"#;
        let pool = decode_pool(URL, PoolId(7), body).unwrap().expect("pool");
        assert_eq!(pool.post_ids, vec![PostId(2), PostId(1)], "order preserved");
    }

    #[test]
    fn empty_list_is_not_found() {
        assert!(decode_pool(URL, PoolId(7), b"[]").unwrap().is_none());
    }

    #[test]
    fn pool_without_posts_is_not_found() {
        let body = br#"{"id":7,"name":"Empty","post_count":0,"post_ids":[]}"#;
        assert!(decode_pool(URL, PoolId(7), body).unwrap().is_none());
        let body = br#"{"success":false,"reason":"not found"}"#;
        assert!(decode_pool(URL, PoolId(7), body).unwrap().is_none());
    }

    #[test]
    fn missing_name_falls_back_to_id() {
        let body = br#"{"post_ids":[1]}"#;
        let pool = decode_pool(URL, PoolId(42), body).unwrap().unwrap();
        assert_eq!(pool.name, "42");
        assert_eq!(pool.image_count, 1);
    }

    #[test]
    fn multi_element_list_picks_requested_pool() {
        let body = br#"[{"id":1,"post_ids":[10]},{"id":7,"post_ids":[70]}]"#;
        let pool = decode_pool(URL, PoolId(7), body).unwrap().unwrap();
        assert_eq!(pool.post_ids, vec![PostId(70)]);
    }

    #[test]
    fn garbage_is_empty_upstream() {
        for body in [&b"<html>oops</html>"[..], b"", b"null", b"\"text\"", br#"{"post_ids":"x"}"#] {
            let err = decode_pool(URL, PoolId(7), body).unwrap_err();
            assert!(matches!(err, SyncError::EmptyUpstream { .. }), "body {body:?}: {err}");
        }
    }

    #[test]
    fn posts_with_and_without_files() {
        let body = br#"{"posts":[
            {"id":1,"file":{"url":"https://cdn/a.png","md5":"aaa","ext":"png"}},
            {"id":2,"file":{"url":null,"md5":"bbb","ext":"jpg"}},
            {"id":3}
        ]}"#;
        let posts = decode_posts(URL, body).unwrap();
        assert_eq!(posts.len(), 3);
        assert!(posts[0].file().is_some());
        assert!(posts[1].file().is_none());
        assert!(posts[2].file().is_none());
        assert_eq!(posts[1].md5.as_deref(), Some("bbb"));
    }

    #[test]
    fn posts_without_posts_key_is_empty_upstream() {
        let err = decode_posts(URL, br#"{"error":"x"}"#).unwrap_err();
        assert!(matches!(err, SyncError::EmptyUpstream { .. }));
    }
}
