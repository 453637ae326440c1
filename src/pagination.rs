//! Relay-style keyset pagination
//!
//! Pages walk the canonical order `created_at DESC, id DESC`. A cursor is the
//! base64 form of `"{id}:{epoch_millis}"` for the row it points at, and the
//! next page is bounded by an anchor predicate on that pair instead of an
//! offset, so concurrent inserts never shift page boundaries.

use async_graphql::{Object, OutputType, SimpleObject};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::warn;

use crate::models::Todo;
use crate::types::DateTime;

/// Page size used when neither `first` nor `last` is given
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Upper bound for `first` and `last`
pub const MAX_PAGE_SIZE: i32 = 100;

/// Page information
#[derive(SimpleObject, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Edge in a connection
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

#[Object(name = "TodoEdge")]
impl<T: OutputType> Edge<T> {
    async fn cursor(&self) -> &str {
        &self.cursor
    }

    async fn node(&self) -> &T {
        &self.node
    }
}

/// Connection (paginated result)
#[derive(Debug, Clone, PartialEq)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
    pub total_count: i64,
}

#[Object(name = "TodoConnection")]
impl<T: OutputType> Connection<T> {
    async fn edges(&self) -> &[Edge<T>] {
        &self.edges
    }

    async fn page_info(&self) -> &PageInfo {
        &self.page_info
    }

    /// Rows matching the filter, ignoring pagination
    async fn total_count(&self) -> i64 {
        self.total_count
    }
}

impl<T> Connection<T> {
    /// Create empty connection
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
            total_count: 0,
        }
    }
}

/// Keyset position of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub id: String,
    pub created_at: DateTime,
}

/// Rows that can be placed in the canonical order
pub trait Keyed {
    fn anchor(&self) -> Anchor;
}

impl Keyed for Todo {
    fn anchor(&self) -> Anchor {
        Anchor {
            id: self.id.to_string(),
            created_at: self.created_at,
        }
    }
}

/// Walking direction relative to the canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Newest first, rows after the anchor
    Forward,
    /// Oldest first, rows before the anchor
    Backward,
}

impl Direction {
    /// SQL ordering used to fetch rows in this direction
    pub fn order_by(self) -> &'static str {
        match self {
            Direction::Forward => "created_at DESC, id DESC",
            Direction::Backward => "created_at ASC, id ASC",
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// Cursor encoding/decoding
pub struct CursorCodec;

impl CursorCodec {
    /// Encode a row position as an opaque cursor
    pub fn encode(id: &str, created_at: DateTime) -> String {
        BASE64.encode(format!("{}:{}", id, created_at.millis()).as_bytes())
    }

    /// Decode a cursor into an anchor.
    ///
    /// Undecodable cursors yield `None` so callers fall back to an
    /// unanchored page.
    pub fn decode(cursor: &str) -> Option<Anchor> {
        match Self::try_decode(cursor) {
            Ok(anchor) => Some(anchor),
            Err(e) => {
                warn!(cursor = %cursor, error = %e, "Ignoring undecodable cursor");
                None
            }
        }
    }

    /// Strict decoding
    pub fn try_decode(cursor: &str) -> crate::Result<Anchor> {
        let bytes = BASE64
            .decode(cursor.as_bytes())
            .map_err(|e| crate::Error::InvalidCursor(e.to_string()))?;
        let raw =
            String::from_utf8(bytes).map_err(|e| crate::Error::InvalidCursor(e.to_string()))?;

        let (id, millis) = raw
            .split_once(':')
            .ok_or_else(|| crate::Error::InvalidCursor("missing ':' separator".to_string()))?;
        if id.is_empty() {
            return Err(crate::Error::InvalidCursor("empty id".to_string()));
        }
        let millis = millis
            .parse::<i64>()
            .map_err(|e| crate::Error::InvalidCursor(format!("bad timestamp: {}", e)))?;
        let created_at = DateTime::from_millis(millis).ok_or_else(|| {
            crate::Error::InvalidCursor(format!("timestamp {} out of range", millis))
        })?;

        Ok(Anchor {
            id: id.to_string(),
            created_at,
        })
    }
}

/// Pagination arguments
///
/// Follows the Relay Cursor Connections Specification:
/// https://relay.dev/graphql/connections.htm
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationInput {
    /// Number of items to return (forward pagination)
    pub first: Option<i32>,

    /// Cursor to start from (forward pagination)
    pub after: Option<String>,

    /// Number of items to return (backward pagination)
    pub last: Option<i32>,

    /// Cursor to start from (backward pagination)
    pub before: Option<String>,
}

impl PaginationInput {
    /// Validate pagination input
    pub fn validate(&self) -> crate::Result<()> {
        if self.first.is_some() && self.last.is_some() {
            return Err(crate::Error::Pagination {
                field: "last",
                message: "Cannot specify both 'first' and 'last'".to_string(),
            });
        }

        for (field, value) in [("first", self.first), ("last", self.last)] {
            if let Some(n) = value {
                if n < 1 {
                    return Err(crate::Error::Pagination {
                        field,
                        message: format!("'{}' must be at least 1", field),
                    });
                }
                if n > MAX_PAGE_SIZE {
                    return Err(crate::Error::Pagination {
                        field,
                        message: format!("'{}' cannot exceed {}", field, MAX_PAGE_SIZE),
                    });
                }
            }
        }

        Ok(())
    }

    /// Check if backward pagination
    pub fn is_backward(&self) -> bool {
        self.last.is_some() || (self.before.is_some() && self.first.is_none())
    }

    /// Resolve direction, page size and anchor.
    ///
    /// Only the cursor matching the direction is used; the other is ignored.
    pub fn page_request(&self) -> PageRequest {
        let direction = if self.is_backward() {
            Direction::Backward
        } else {
            Direction::Forward
        };
        let (size, cursor) = match direction {
            Direction::Forward => (self.first, self.after.as_deref()),
            Direction::Backward => (self.last, self.before.as_deref()),
        };

        PageRequest {
            direction,
            page_size: size
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            anchor: cursor.and_then(CursorCodec::decode),
        }
    }
}

/// A validated, decoded page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub direction: Direction,
    pub page_size: usize,
    pub anchor: Option<Anchor>,
}

impl PageRequest {
    /// Rows to fetch: one extra reveals whether another page exists
    pub fn fetch_limit(&self) -> i64 {
        self.page_size as i64 + 1
    }
}

/// Row source for the keyset engine, already restricted to a base filter
#[async_trait]
pub trait KeysetSource<T>: Send + Sync {
    type Error: Send;

    /// Up to `limit` rows strictly past `anchor` in `direction` order
    async fn fetch(
        &self,
        direction: Direction,
        anchor: Option<&Anchor>,
        limit: i64,
    ) -> Result<Vec<T>, Self::Error>;

    /// Whether any row lies strictly past `anchor` in `direction`
    async fn exists_past(&self, direction: Direction, anchor: &Anchor)
        -> Result<bool, Self::Error>;

    /// Rows matching the base filter
    async fn count(&self) -> Result<i64, Self::Error>;
}

/// Fetch one page and derive its page info
pub async fn paginate<T, S>(source: &S, request: &PageRequest) -> Result<Connection<T>, S::Error>
where
    T: Keyed,
    S: KeysetSource<T> + ?Sized,
{
    let mut rows = source
        .fetch(request.direction, request.anchor.as_ref(), request.fetch_limit())
        .await?;

    let has_more = rows.len() > request.page_size;
    rows.truncate(request.page_size);
    if request.direction == Direction::Backward {
        rows.reverse();
    }

    // Opposite side of the page: probe past its boundary row
    let boundary = match request.direction {
        Direction::Forward => rows.first(),
        Direction::Backward => rows.last(),
    };
    let has_opposite = match boundary {
        Some(row) => {
            source
                .exists_past(request.direction.reverse(), &row.anchor())
                .await?
        }
        None => request.anchor.is_some(),
    };

    let edges: Vec<Edge<T>> = rows
        .into_iter()
        .map(|node| {
            let anchor = node.anchor();
            Edge {
                cursor: CursorCodec::encode(&anchor.id, anchor.created_at),
                node,
            }
        })
        .collect();

    let (has_next_page, has_previous_page) = match request.direction {
        Direction::Forward => (has_more, has_opposite),
        Direction::Backward => (has_opposite, has_more),
    };

    let total_count = source.count().await?;

    Ok(Connection {
        page_info: PageInfo {
            has_next_page,
            has_previous_page,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        },
        edges,
        total_count,
    })
}
