use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Debit Note Service",
        version = "0.1.0",
        description = r#"
# Debit Note Service

Builds unsaved debit/credit notes from submitted sales and purchase documents.
Quantities already returned against the source are netted out, serial numbers
already returned are dropped and payment terms are reversed.

## Request context

- `X-User-Id`: acting user (defaults to `Guest`)
- `Accept-Language`: language used for translated labels
- `X-Request-Id`: echoed on every response; generated when absent

## Error Handling

Errors use a consistent body:

```json
{
  "error": "Bad Request",
  "message": "Cannot map because following condition fails: docstatus=1",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Debit Notes", description = "Debit note generation"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::debit_notes::make_sales_debit,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::ApiResponse<crate::models::TransactionDocument>,
            crate::handlers::debit_notes::MakeDebitNoteRequest,
            crate::handlers::health::HealthResponse,
            crate::services::mapper::TargetDoc,
            crate::models::Doctype,
            crate::models::TransactionDocument,
            crate::models::ItemRow,
            crate::models::TaxRow,
            crate::models::ChargeType,
            crate::models::PaymentRow,
            crate::models::PaymentScheduleRow,
            crate::models::PackedItem,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
