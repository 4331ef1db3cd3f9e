//! Checkout route handlers.
//!
//! Creates the order + payment session, offers the available payment
//! methods, drives the generic confirm flow, and hosts the success route
//! that re-verifies status against the backend.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use driftwood_core::{OrderNumber, PaymentStatus};

use crate::checkout::{FlowOutcome, PaymentMethod, available_methods, confirm_flow};
use crate::error::{AppError, Result};
use crate::filters;
use crate::identity::ensure_identity;
use crate::models::flash::{self, Notice};
use crate::models::session_keys;
use crate::state::AppState;
use crate::stores::payment::PaymentSession;

/// Payment method display data for templates.
#[derive(Clone)]
pub struct MethodView {
    pub value: &'static str,
    pub label: &'static str,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub order_number: String,
    pub total: String,
    pub methods: Vec<MethodView>,
    pub notices: Vec<Notice>,
}

/// Success page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub order_number: String,
    pub status: String,
    pub succeeded: bool,
    pub notices: Vec<Notice>,
}

/// Response of `POST /orders` (order creation from the cart).
#[derive(Debug, Deserialize)]
struct OrderResponse {
    order_number: OrderNumber,
}

/// Confirm form data.
#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    pub method: PaymentMethod,
}

/// Success route query parameters.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub order: String,
}

/// Begin checkout: turn the cart into an order and obtain a payment
/// session for it.
#[instrument(skip(state, session))]
pub async fn begin(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    let identity = ensure_identity(&session, state.api()).await?;

    let order: OrderResponse = state
        .api()
        .post("/orders", &identity, &serde_json::json!({}))
        .await?;

    let store = state.payment_store(identity);
    let view = store.begin_checkout(order.order_number).await;

    match view.data {
        Some(payment) => {
            session
                .insert(session_keys::PAYMENT_SESSION, &payment)
                .await
                .map_err(AppError::Session)?;
            Ok(Redirect::to("/checkout/payment"))
        }
        None => {
            let message = view
                .error
                .unwrap_or_else(|| "Checkout could not be started.".to_string());
            flash::push_notice(&session, Notice::error(message)).await;
            Ok(Redirect::to("/cart"))
        }
    }
}

/// Display the payment method selection page.
///
/// The wallet option only appears when the capability probe says it is
/// available; otherwise it is absent entirely.
#[instrument(skip(state, session))]
pub async fn payment_page(State(state): State<AppState>, session: Session) -> Result<Response> {
    let Some(payment) = session
        .get::<PaymentSession>(session_keys::PAYMENT_SESSION)
        .await
        .map_err(AppError::Session)?
    else {
        return Ok(Redirect::to("/cart").into_response());
    };

    let methods = available_methods(state.gateway())
        .await
        .into_iter()
        .map(|method| MethodView {
            value: method.as_str(),
            label: method.label(),
        })
        .collect();

    Ok(PaymentTemplate {
        order_number: payment.order_number.to_string(),
        total: payment.total.display(),
        methods,
        notices: flash::take_notices(&session).await,
    }
    .into_response())
}

/// Confirm the payment via the chosen method.
#[instrument(skip(state, session))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ConfirmForm>,
) -> Result<Redirect> {
    let Some(payment) = session
        .get::<PaymentSession>(session_keys::PAYMENT_SESSION)
        .await
        .map_err(AppError::Session)?
    else {
        return Ok(Redirect::to("/cart"));
    };

    let outcome = confirm_flow(
        state.gateway(),
        &payment.client_secret,
        &payment.order_number,
        form.method,
        &state.config().base_url,
    )
    .await;

    match outcome {
        FlowOutcome::NotReady => {
            flash::push_notice(
                &session,
                Notice::error("Payments are temporarily unavailable. Please try again shortly."),
            )
            .await;
            Ok(Redirect::to("/checkout/payment"))
        }
        FlowOutcome::Succeeded { notice, location } => {
            flash::push_notice(&session, notice).await;
            Ok(Redirect::to(&location))
        }
        FlowOutcome::InFlight { location } => Ok(Redirect::to(&location)),
        FlowOutcome::Failed { notice } => {
            flash::push_notice(&session, notice).await;
            Ok(Redirect::to("/checkout/payment"))
        }
    }
}

/// Success route: the sole confirmation point for redirect-based methods.
///
/// Always re-verifies the status against the backend rather than trusting
/// the query string; the browser may have arrived straight from the
/// provider with no local payment session at all.
#[instrument(skip(state, session))]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SuccessQuery>,
) -> Result<SuccessTemplate> {
    let identity = ensure_identity(&session, state.api()).await?;
    let order_number = OrderNumber::from(query.order.as_str());

    let store = state.payment_store(identity);
    let status = store
        .verify_status(&order_number)
        .await
        .unwrap_or(PaymentStatus::Pending);

    if status.is_terminal() {
        // The payment session has served its purpose.
        session
            .remove::<PaymentSession>(session_keys::PAYMENT_SESSION)
            .await
            .map_err(AppError::Session)?;
    }

    Ok(SuccessTemplate {
        order_number: order_number.to_string(),
        status: status.to_string(),
        succeeded: status == PaymentStatus::Succeeded,
        notices: flash::take_notices(&session).await,
    })
}
