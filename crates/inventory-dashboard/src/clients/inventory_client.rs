//! # Inventory Client
//!
//! Provides a high‑level API for interacting with the inventory service.
//! It wraps a `SourceClient<Item>` and exposes the two calls the dashboard makes: listing the
//! inventory and claiming one unit of an item.
//!
//! The same client is plugged into the framework twice: as the [`Fetcher`] behind the
//! inventory loader and as the [`Mutator`] behind the claim tracker.
use crate::inventory_actor::{InventoryAction, InventoryError};
use crate::model::{ClaimRequest, Item, ItemId};
use async_trait::async_trait;
use fetcher_framework::{ActorClient, FetchError, Fetcher, FrameworkError, Mutator, SourceClient};
use tracing::{debug, instrument};

/// Client for interacting with the Inventory actor.
#[derive(Clone)]
pub struct InventoryClient {
    inner: SourceClient<Item>,
}

impl InventoryClient {
    pub fn new(inner: SourceClient<Item>) -> Self {
        Self { inner }
    }

    /// Lists every item, in catalogue order.
    #[instrument(skip(self))]
    pub async fn fetch_inventory(&self) -> Result<Vec<Item>, InventoryError> {
        debug!("Sending request");
        self.list().await
    }

    /// Claims one unit of `id` and returns the updated item.
    #[instrument(skip(self))]
    pub async fn claim_stock(&self, id: ItemId) -> Result<Item, InventoryError> {
        debug!("Claiming one unit");
        self.inner
            .perform_action(id, InventoryAction::Claim)
            .await
            .map_err(Self::map_error)
    }
}

#[async_trait]
impl ActorClient<Item> for InventoryClient {
    type Error = InventoryError;

    fn inner(&self) -> &SourceClient<Item> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::Unavailable(reason) => InventoryError::Unavailable(reason),
            FrameworkError::NotFound(id) => InventoryError::NotFound(id),
            FrameworkError::EntityError(inner) => match inner.downcast::<InventoryError>() {
                Ok(domain) => *domain,
                Err(other) => InventoryError::ActorCommunicationError(other.to_string()),
            },
            other => InventoryError::ActorCommunicationError(other.to_string()),
        }
    }
}

#[async_trait]
impl Fetcher for InventoryClient {
    type Output = Vec<Item>;

    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        self.fetch_inventory()
            .await
            .map_err(|e| FetchError::Source(format!("Could not load inventory: {e}")))
    }
}

#[async_trait]
impl Mutator for InventoryClient {
    type Key = ItemId;
    type Request = ClaimRequest;
    type Output = Item;

    fn key(request: &ClaimRequest) -> ItemId {
        request.item_id.clone()
    }

    async fn commit(&self, request: ClaimRequest) -> Result<Item, String> {
        self.claim_stock(request.item_id)
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetcher_framework::mock::{create_mock_client, expect_action, MockClient};

    #[tokio::test]
    async fn test_claim_stock_sends_claim_action() {
        let (client, mut receiver) = create_mock_client::<Item>(10);
        let inventory_client = InventoryClient::new(client);

        let claim_task =
            tokio::spawn(async move { inventory_client.claim_stock("widget".into()).await });

        let (id, action, responder) = expect_action(&mut receiver)
            .await
            .expect("Expected Action request");
        assert_eq!(id, ItemId::from("widget"));
        assert_eq!(action, InventoryAction::Claim);

        responder.send(Ok(Item::new("widget", "Widget", 2))).unwrap();

        let result = claim_task.await.unwrap();
        assert_eq!(result.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_entity_error_is_recovered_as_domain_error() {
        let (client, mut receiver) = create_mock_client::<Item>(10);
        let inventory_client = InventoryClient::new(client);

        let claim_task =
            tokio::spawn(async move { inventory_client.commit(ClaimRequest::new("gadget")).await });

        let (_, _, responder) = expect_action(&mut receiver).await.unwrap();
        responder
            .send(Err(FrameworkError::EntityError(Box::new(
                InventoryError::OutOfStock,
            ))))
            .unwrap();

        assert_eq!(claim_task.await.unwrap(), Err("Out of stock".to_string()));
    }

    #[tokio::test]
    async fn test_unavailable_source_becomes_fetch_error() {
        let mut mock = MockClient::<Item>::new();
        mock.expect_list()
            .return_err(FrameworkError::Unavailable("Service unavailable".into()));
        mock.expect_list()
            .return_ok(vec![Item::new("widget", "Widget", 3)]);

        let client = InventoryClient::new(mock.client());

        let err = client.fetch().await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Source("Could not load inventory: Service unavailable".into())
        );
        assert_eq!(client.fetch().await.unwrap().len(), 1);

        mock.verify();
    }

    #[test]
    fn test_key_is_the_item_id() {
        let request = ClaimRequest::new("sprocket");
        assert_eq!(InventoryClient::key(&request), ItemId::from("sprocket"));
    }
}
