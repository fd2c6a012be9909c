//! Reply threading header construction
//!
//! Mail clients group replies into conversations through the `In-Reply-To`
//! and `References` headers (RFC 5322 convention). The caller supplies the
//! prior message id and references chain; no thread state is kept here.

/// Threading headers for an outbound reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadingHeaders {
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
}

/// Compute threading headers from an optional prior message id and an
/// optional prior references chain.
///
/// With a message id, `In-Reply-To` is that id and it is appended to the end
/// of the references chain (space separated). Without one, the references
/// chain passes through unchanged. Id format is not validated; malformed ids
/// pass through as-is.
pub fn threading_headers(
    message_id: Option<&str>,
    references: Option<&str>,
) -> ThreadingHeaders {
    match message_id {
        None => ThreadingHeaders {
            in_reply_to: None,
            references: references.map(str::to_string),
        },
        Some(id) => ThreadingHeaders {
            in_reply_to: Some(id.to_string()),
            references: Some(match references {
                Some(refs) => format!("{} {}", refs, id),
                None => id.to_string(),
            }),
        },
    }
}
