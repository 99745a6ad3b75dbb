use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TokenResp {
    pub access_token: String,
}

/// Reddit "Listing" envelope: `{"kind":"Listing","data":{"children":[...]}}`.
#[derive(Debug, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

/// One collected item: a post with a directly attached source image.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub url: String,
    pub permalink: String,
    pub score: i64,
}

/// A top-level comment body with its score. Fields default so that the
/// non-comment children of a comment listing ("more" stubs) still
/// deserialize; callers filter on `Thing::kind`.
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
}
