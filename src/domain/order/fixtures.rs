use uuid::Uuid;

use super::command_handler::OrderCommandHandler;
use super::commands::OrderCommand;
use super::errors::OrderCommandError;
use super::value_objects::{Email, OrderNumber, PhotoReference};

// ============================================================================
// Demo orders - the three customers the storefront advertises for testing
// ============================================================================

/// No order is ever placed for this address
pub const NOT_FOUND_EMAIL: &str = "erro@teste.com";
pub const IN_PRODUCTION_EMAIL: &str = "producao@teste.com";
pub const IN_PRODUCTION_ORDER: &str = "PET-2025-001";
pub const READY_EMAIL: &str = "pronto@teste.com";
pub const READY_ORDER: &str = "PET-2025-002";

/// Placeholder artwork for the ready demo order
pub const DEMO_PHOTO_FILENAME: &str = "custom-ceramic-pet-mug-with-cute-dog-illustration.svg";
pub const DEMO_PHOTO_CONTENT_TYPE: &str = "image/svg+xml";
pub const DEMO_PHOTO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="320" height="240" viewBox="0 0 320 240">
<rect width="320" height="240" fill="#fdf6ec"/>
<rect x="90" y="60" width="120" height="130" rx="12" fill="#ffffff" stroke="#6b4f3a" stroke-width="4"/>
<path d="M210 90 q45 0 45 40 q0 40 -45 40" fill="none" stroke="#6b4f3a" stroke-width="8"/>
<circle cx="150" cy="120" r="28" fill="#d9a066"/>
<circle cx="140" cy="114" r="4" fill="#3b2a1e"/>
<circle cx="160" cy="114" r="4" fill="#3b2a1e"/>
<ellipse cx="150" cy="128" rx="6" ry="4" fill="#3b2a1e"/>
<text x="160" y="222" font-family="sans-serif" font-size="16" text-anchor="middle" fill="#6b4f3a">Looneca</text>
</svg>
"##;

/// Photo reference the test stores record for the ready demo order
#[cfg(test)]
pub const READY_PHOTO: &str = "/photos/PET-2025-002/demo.svg";

/// Place the demo orders, the second one already showing `ready_photo`.
/// Seeding an already seeded store is a no-op.
pub async fn seed(handler: &OrderCommandHandler, ready_photo: PhotoReference) -> Result<(), OrderCommandError> {
    let correlation_id = Uuid::new_v4();

    let in_production = OrderNumber::parse(IN_PRODUCTION_ORDER)?;
    place(handler, &in_production, IN_PRODUCTION_EMAIL, correlation_id).await?;

    let ready = OrderNumber::parse(READY_ORDER)?;
    place(handler, &ready, READY_EMAIL, correlation_id).await?;
    handler
        .handle(
            &ready,
            OrderCommand::LinkPhoto {
                photo: ready_photo,
                idempotency_key: format!("seed-{}", READY_ORDER),
                replace_existing: false,
            },
            correlation_id,
        )
        .await?;

    tracing::info!(orders = 2, "Seeded demo orders");
    Ok(())
}

async fn place(
    handler: &OrderCommandHandler,
    order_number: &OrderNumber,
    email: &str,
    correlation_id: Uuid,
) -> Result<(), OrderCommandError> {
    let command = OrderCommand::PlaceOrder {
        order_number: order_number.clone(),
        customer_email: Email::parse(email)?,
    };

    match handler.handle(order_number, command, correlation_id).await {
        Ok(_) => Ok(()),
        Err(OrderCommandError::Rejected(super::errors::OrderError::AlreadyPlaced(_))) => Ok(()),
        Err(e) => Err(e),
    }
}
