use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{fixtures, Email, OrderCommand, OrderCommandHandler, OrderNumber, OrderStore};
use super::errors::ServiceError;
use super::photo_storage::{PhotoStorage, PhotoUpload};

/// Records orders placed by the fulfillment system so customers can track them
pub struct OrderRegistrationService {
    handler: OrderCommandHandler,
}

impl OrderRegistrationService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self {
            handler: OrderCommandHandler::new(store),
        }
    }

    /// Place a new order in production.
    ///
    /// Registering an order number twice is a `Conflict`.
    pub async fn register(&self, customer_email: &str, order_number: &str) -> Result<OrderNumber, ServiceError> {
        let customer_email = Email::parse(customer_email)?;
        let order_number = OrderNumber::parse(order_number)?;

        let outcome = self
            .handler
            .handle(
                &order_number,
                OrderCommand::PlaceOrder {
                    order_number: order_number.clone(),
                    customer_email,
                },
                Uuid::new_v4(),
            )
            .await?;

        Ok(outcome.order.order_number)
    }

    /// Place the demo orders, storing the placeholder artwork of the ready
    /// one in `photos` so its page links to a photo that is actually served
    pub async fn seed_demo_orders(&self, photos: &dyn PhotoStorage) -> Result<(), ServiceError> {
        let ready_order = OrderNumber::parse(fixtures::READY_ORDER)?;
        let ready_photo = photos
            .put(
                &ready_order,
                PhotoUpload {
                    filename: fixtures::DEMO_PHOTO_FILENAME.to_string(),
                    content_type: fixtures::DEMO_PHOTO_CONTENT_TYPE.to_string(),
                    bytes: fixtures::DEMO_PHOTO_SVG.as_bytes().to_vec(),
                },
            )
            .await?;

        fixtures::seed(&self.handler, ready_photo).await?;
        Ok(())
    }
}
