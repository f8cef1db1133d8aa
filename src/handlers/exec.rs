use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::{IntoParams, ToSchema};

use crate::domain::codec::format_timestamp;
use crate::domain::order::Order;
use crate::domain::query::PageRequest;
use crate::errors::AppError;
use crate::SharedOrderService;

const SUCCESS: &str = "success";

/// Query parameters shared by every action.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ExecParams {
    /// `submit`, `getOrders`, `getOrdersByDateRange` or `ping`.
    pub action: Option<String>,
    /// JSON-encoded order, for `submit`.
    pub data: Option<String>,
    /// Page number (1-based, default 1).
    pub page: Option<String>,
    /// Orders per page (default 10).
    pub limit: Option<String>,
    /// First day of the export range, e.g. `2025-01-01`.
    pub start_date: Option<String>,
    /// Last day of the export range, inclusive.
    pub end_date: Option<String>,
    /// Sheet to use instead of the configured one.
    pub orders_sheet: Option<String>,
    /// When set, the response is returned as `callback(<json>)`.
    pub callback: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_number: String,
    pub depositor_name: String,
    pub contact: String,
    pub product: String,
    pub address: String,
    pub address_detail: String,
    pub order_time: String,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            order_number: o.order_number,
            depositor_name: o.depositor_name,
            contact: o.contact,
            product: o.product,
            address: o.address,
            address_detail: o.address_detail,
            order_time: o.order_time,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub status: String,
    pub message: String,
    pub order_number: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderPageResponse {
    pub status: String,
    pub orders: Vec<OrderResponse>,
    pub has_more: bool,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderRangeResponse {
    pub status: String,
    pub orders: Vec<OrderResponse>,
    pub total_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

/// GET /exec
///
/// Runs the requested `action`. Failures come back as
/// `{"status": "error", "message": ...}` with HTTP 200, and every response
/// honours `callback`.
#[utoipa::path(
    get,
    path = "/exec",
    params(ExecParams),
    responses(
        (status = 200, description = "JSON envelope, or JSONP when `callback` is given"),
    ),
    tag = "orders"
)]
pub async fn exec(
    service: web::Data<SharedOrderService>,
    query: web::Query<ExecParams>,
) -> HttpResponse {
    let params = query.into_inner();
    let callback = params.callback.clone().filter(|name| is_valid_callback(name));

    let body = match dispatch(service, params).await {
        Ok(body) => body,
        Err(e) => e.envelope(),
    };
    respond(body, callback.as_deref())
}

async fn dispatch(
    service: web::Data<SharedOrderService>,
    params: ExecParams,
) -> Result<Value, AppError> {
    let ExecParams {
        action,
        data,
        page,
        limit,
        start_date,
        end_date,
        orders_sheet,
        ..
    } = params;

    match action.as_deref().map(str::trim).unwrap_or_default() {
        "submit" => {
            let receipt = web::block(move || {
                service.submit_payload(data.as_deref(), orders_sheet.as_deref())
            })
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

            Ok(serde_json::to_value(SubmitResponse {
                status: SUCCESS.to_string(),
                message: "주문이 접수되었습니다.".to_string(),
                order_number: receipt.order_number,
            })?)
        }
        "getOrders" => {
            let request = PageRequest::parse(page.as_deref(), limit.as_deref());
            let page = web::block(move || service.list_recent(request, orders_sheet.as_deref()))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))??;

            Ok(serde_json::to_value(OrderPageResponse {
                status: SUCCESS.to_string(),
                has_more: page.has_more,
                total_count: page.total_count,
                current_page: page.current_page,
                total_pages: page.total_pages,
                orders: page.items.into_iter().map(OrderResponse::from).collect(),
            })?)
        }
        "getOrdersByDateRange" => {
            let result = web::block(move || {
                service.list_by_range(
                    start_date.as_deref(),
                    end_date.as_deref(),
                    orders_sheet.as_deref(),
                )
            })
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

            match result {
                Ok(orders) => Ok(serde_json::to_value(OrderRangeResponse {
                    status: SUCCESS.to_string(),
                    total_count: orders.len(),
                    orders: orders.into_iter().map(OrderResponse::from).collect(),
                })?),
                Err(e) => {
                    let mut body = AppError::from(e).envelope();
                    body["orders"] = json!([]);
                    Ok(body)
                }
            }
        }
        "ping" => Ok(serde_json::to_value(PingResponse {
            status: SUCCESS.to_string(),
            message: "ok".to_string(),
            timestamp: format_timestamp(&service.now()),
        })?),
        _ => Err(AppError::BadRequest("지원하지 않는 요청입니다.".to_string())),
    }
}

fn respond(body: Value, callback: Option<&str>) -> HttpResponse {
    match callback {
        Some(name) => HttpResponse::Ok()
            .content_type("application/javascript; charset=utf-8")
            .body(format!("{name}({body})")),
        None => HttpResponse::Ok().json(body),
    }
}

/// Accepts dotted JavaScript identifiers such as `jQuery123_456` or `app.cb`.
pub fn is_valid_callback(name: &str) -> bool {
    name.len() <= 128
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}
