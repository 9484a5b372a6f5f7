//! Continuation-token pagination.
//!
//! The paginator drives repeated executions of one operation, feeding each
//! page's continuation token back into the next request, until the token
//! disappears or the page-count safety bound trips. Failures are terminal:
//! no partial-result retry across pages.

use crate::client::AwsClient;
use crate::error::AwsError;
use crate::operation::{OperationDescriptor, OperationInput};
use crate::response::OperationOutput;

/// Default page-count safety bound.
pub const DEFAULT_MAX_PAGES: u32 = 1000;

/// An input that can carry a continuation token.
pub trait PageableInput: OperationInput {
    /// A copy of this input with the continuation token replaced.
    fn with_token(&self, token: &str) -> Self
    where
        Self: Sized;
}

/// An output carrying a page of items and an optional continuation token.
pub trait PageableOutput: OperationOutput {
    /// The element type of the page's list field.
    type Item: Send;

    /// The continuation token, if the service reported more pages.
    fn next_token(&self) -> Option<&str>;

    /// The page's items.
    fn into_items(self) -> Vec<Self::Item>;
}

impl AwsClient {
    /// Fetch every page and return the flattened item list.
    pub async fn paginate<I, O>(
        &self,
        operation: &OperationDescriptor,
        input: I,
        max_pages: u32,
    ) -> Result<Vec<O::Item>, AwsError>
    where
        I: PageableInput,
        O: PageableOutput,
    {
        let mut items = Vec::new();
        self.paginate_pages::<I, O, _>(operation, input, max_pages, |page| {
            items.extend(page.into_items());
        })
        .await?;
        Ok(items)
    }

    /// Stream pages to a consumer as they arrive.
    pub async fn paginate_pages<I, O, F>(
        &self,
        operation: &OperationDescriptor,
        input: I,
        max_pages: u32,
        mut consumer: F,
    ) -> Result<(), AwsError>
    where
        I: PageableInput,
        O: PageableOutput,
        F: FnMut(O) + Send,
    {
        let mut current = input;
        let mut pages = 0u32;

        loop {
            if pages >= max_pages {
                return Err(AwsError::PaginationLimit { pages });
            }

            let output: O = self.execute(operation, &current).await?;
            pages += 1;

            let token = output
                .next_token()
                .filter(|t| !t.is_empty())
                .map(String::from);
            consumer(output);

            match token {
                Some(token) => current = current.with_token(&token),
                None => return Ok(()),
            }
        }
    }
}
