//! Non-fatal findings about a record, gathered while its document is drawn
//! and handed back to the caller next to the signed URL.

use std::{cell::RefCell, fmt};

use crate::record::Shape;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A visible scalar field held a value the table cannot list.
    OmittedField {
        field_id: String,
        field_name: String,
        shape: Shape,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OmittedField {
                field_id,
                field_name,
                shape,
            } => write!(
                f,
                "field {field_name:?} ({field_id}) holds {shape} and was left out of the table"
            ),
        }
    }
}

tokio::task_local! {
    static PENDING: RefCell<Vec<Notice>>;
}

/// Files `notice` against the render running on this task. Outside of
/// [`collect`] it is discarded.
pub fn raise(notice: Notice) {
    let _ = PENDING.try_with(|pending| pending.borrow_mut().push(notice));
}

/// Drives `f` to completion and returns its output along with every notice
/// raised on its behalf, in the order they were raised.
pub async fn collect<F, T>(f: F) -> (T, Vec<Notice>)
where
    F: Future<Output = T>,
{
    PENDING
        .scope(RefCell::default(), async {
            let output = f.await;
            (output, PENDING.with(RefCell::take))
        })
        .await
}

/// Field ids named by the `OmittedField` notices in `notices`.
pub fn omitted_fields(notices: &[Notice]) -> impl Iterator<Item = &str> {
    notices.iter().map(|notice| match notice {
        Notice::OmittedField { field_id, .. } => field_id.as_str(),
    })
}
