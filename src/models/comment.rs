use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProductComment {
    pub id: i64,
    #[serde(rename = "product")]
    pub product_id: i64,
    #[serde(rename = "parent")]
    pub parent_id: Option<i64>,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub text: String,
    #[serde(rename = "created_date")]
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: ProductComment,
    pub replies: Vec<CommentThread>,
}

impl CommentThread {
    /// Builds reply trees from a flat list ordered by creation.
    ///
    /// Comments whose parent is missing from the list are promoted to roots.
    pub fn build(comments: Vec<ProductComment>) -> Vec<CommentThread> {
        let known: HashSet<i64> = comments.iter().map(|c| c.id).collect();
        let mut children: HashMap<i64, Vec<ProductComment>> = HashMap::new();
        let mut roots = Vec::new();

        for comment in comments {
            match comment.parent_id {
                Some(parent) if known.contains(&parent) => {
                    children.entry(parent).or_default().push(comment)
                }
                _ => roots.push(comment),
            }
        }

        roots
            .into_iter()
            .map(|root| Self::attach(root, &mut children))
            .collect()
    }

    fn attach(comment: ProductComment, children: &mut HashMap<i64, Vec<ProductComment>>) -> Self {
        let replies = children
            .remove(&comment.id)
            .unwrap_or_default()
            .into_iter()
            .map(|child| Self::attach(child, children))
            .collect();
        Self { comment, replies }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
    pub parent: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentTextRequest {
    #[serde(default)]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64, parent_id: Option<i64>) -> ProductComment {
        ProductComment {
            id,
            product_id: 1,
            parent_id,
            user_id: 1,
            text: format!("comment {}", id),
            created_at: id,
        }
    }

    #[test]
    fn test_build_nests_replies_under_parents() {
        let threads = CommentThread::build(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, None),
            comment(4, Some(2)),
            comment(5, Some(1)),
        ]);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, 1);
        let replies: Vec<i64> = threads[0].replies.iter().map(|r| r.comment.id).collect();
        assert_eq!(replies, vec![2, 5]);
        assert_eq!(threads[0].replies[0].replies[0].comment.id, 4);
        assert!(threads[1].replies.is_empty());
    }

    #[test]
    fn test_build_promotes_orphans_to_roots() {
        let threads = CommentThread::build(vec![comment(7, Some(99)), comment(8, None)]);
        let ids: Vec<i64> = threads.iter().map(|t| t.comment.id).collect();
        assert_eq!(ids, vec![7, 8]);
    }
}
