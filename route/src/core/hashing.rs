//! Content-addressed input hashes for review and judge memoization.
//!
//! Both hashes are SHA-256, lowercase hex. Entries are sorted before hashing
//! and framed with a header carrying their name and length, so the digest
//! depends only on content and never on enumeration order.

use sha2::{Digest, Sha256};

/// One resolved artifact: path relative to the route root plus raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactContent {
    pub path: String,
    pub content: Vec<u8>,
}

/// Hash the stone's artifacts into the review input hash.
pub fn review_input_hash(artifacts: &[ArtifactContent]) -> String {
    let mut sorted: Vec<&ArtifactContent> = artifacts.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut hasher = Sha256::new();
    for artifact in sorted {
        update_entry(&mut hasher, &artifact.path, &artifact.content);
    }
    hex::encode(hasher.finalize())
}

/// Hash review outputs and approval state into the judge input hash.
///
/// `reviews` holds `(basename, content)` for every review artifact recorded
/// under `review_input_hash`.
pub fn judge_input_hash(review_input_hash: &str, reviews: &[(String, String)], approved: bool) -> String {
    let mut sorted: Vec<&(String, String)> = reviews.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    hasher.update(format!("review-input-hash: {review_input_hash}\n").as_bytes());
    for (name, content) in sorted {
        update_entry(&mut hasher, name, content.as_bytes());
    }
    hasher.update(format!("approved: {approved}\n").as_bytes());
    hex::encode(hasher.finalize())
}

fn update_entry(hasher: &mut Sha256, name: &str, content: &[u8]) {
    hasher.update(format!("--- {name} ({} bytes) ---\n", content.len()).as_bytes());
    hasher.update(content);
    hasher.update(b"\n");
}
