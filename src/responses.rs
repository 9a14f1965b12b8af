//! Response envelopes.
//!
//! Every handler outcome is rendered through a [`ResponseTable`]: an immutable
//! route → method → status → [`Template`] mapping built once at startup. A
//! triple missing from the table never fails; it renders the
//! [`Envelope::Unknown`] fallback instead.

use std::collections::HashMap;

use axum::http::{Method, StatusCode};
use chrono::Local;
use serde::Serialize;

use crate::models::Product;

pub const API_NAME: &str = "JM-PRODUCTS-API";
pub const API_VERSION: &str = "1.0.0";

const UNKNOWN_MESSAGE: &str = "Erro desconhecido.";

/// Registered route patterns (not raw request paths).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKey {
    Root,
    Products,
    ProductById,
    ProductsByCategory,
}

impl RouteKey {
    pub const fn pattern(self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::Products => "/products",
            Self::ProductById => "/products/:id",
            Self::ProductsByCategory => "/category/:name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    Conflict,
    InternalServerError,
}

/// Shape and fixed text of one table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    Welcome {
        api: &'static str,
        message: &'static str,
        version: &'static str,
    },
    Collection {
        message: &'static str,
    },
    Single {
        message: &'static str,
    },
    Error {
        code: ErrorCode,
        message: &'static str,
    },
}

/// Result data handed to the builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Absent,
    Single(Product),
    List(Vec<Product>),
}

impl From<Product> for Payload {
    fn from(product: Product) -> Self {
        Self::Single(product)
    }
}

impl From<Vec<Product>> for Payload {
    fn from(products: Vec<Product>) -> Self {
        Self::List(products)
    }
}

impl From<Option<Product>> for Payload {
    fn from(product: Option<Product>) -> Self {
        product.map_or(Self::Absent, Self::Single)
    }
}

/// Serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmptyObject {}

/// Body of the `product` field in single-entity envelopes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProductBody {
    Entity(Box<Product>),
    List(Vec<Product>),
    Empty(EmptyObject),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Welcome {
        api: &'static str,
        message: &'static str,
        version: &'static str,
        timestamp: String,
    },
    Collection {
        success: bool,
        message: &'static str,
        total: usize,
        products: Vec<Product>,
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Single {
        success: bool,
        message: &'static str,
        product: ProductBody,
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Error {
        error: ErrorCode,
        message: &'static str,
        timestamp: String,
    },
    Unknown {
        success: bool,
        message: &'static str,
        #[serde(rename = "statusCode")]
        status_code: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

impl Envelope {
    pub fn unknown(status: StatusCode) -> Self {
        Self::Unknown {
            success: false,
            message: UNKNOWN_MESSAGE,
            status_code: status.as_u16(),
            timestamp: None,
        }
    }

    /// Sets (or refreshes) the timestamp on any envelope shape.
    fn stamp(&mut self, now: String) {
        match self {
            Self::Welcome { timestamp, .. } | Self::Error { timestamp, .. } => *timestamp = now,
            Self::Collection { timestamp, .. }
            | Self::Single { timestamp, .. }
            | Self::Unknown { timestamp, .. } => *timestamp = Some(now),
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        match self {
            Self::Welcome { timestamp, .. } | Self::Error { timestamp, .. } => {
                Some(timestamp.as_str())
            }
            Self::Collection { timestamp, .. }
            | Self::Single { timestamp, .. }
            | Self::Unknown { timestamp, .. } => timestamp.as_deref(),
        }
    }
}

/// Wall-clock time as shown in envelopes, rendered on every call.
fn render_timestamp() -> String {
    Local::now().format("%d/%m/%Y %H:%M:%S").to_string()
}

impl Template {
    fn render(&self, payload: Payload) -> Envelope {
        match *self {
            Self::Welcome { api, message, version } => Envelope::Welcome {
                api,
                message,
                version,
                timestamp: render_timestamp(),
            },
            Self::Collection { message } => {
                let products = match payload {
                    Payload::Absent => Vec::new(),
                    Payload::Single(product) => vec![product],
                    Payload::List(products) => products,
                };
                Envelope::Collection {
                    success: true,
                    message,
                    total: products.len(),
                    products,
                    timestamp: None,
                }
            }
            Self::Single { message } => {
                let product = match payload {
                    Payload::Absent => ProductBody::Empty(EmptyObject {}),
                    Payload::Single(product) => ProductBody::Entity(Box::new(product)),
                    Payload::List(products) => ProductBody::List(products),
                };
                Envelope::Single {
                    success: true,
                    message,
                    product,
                    timestamp: None,
                }
            }
            Self::Error { code, message } => Envelope::Error {
                error: code,
                message,
                timestamp: render_timestamp(),
            },
        }
    }
}

type StatusTemplates = HashMap<StatusCode, Template>;

#[derive(Debug, Clone, Default)]
pub struct ResponseTable {
    routes: HashMap<RouteKey, HashMap<Method, StatusTemplates>>,
}

impl ResponseTable {
    /// An empty table: every triple renders the fallback.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        route: RouteKey,
        method: Method,
        status: StatusCode,
        template: Template,
    ) -> Self {
        self.routes
            .entry(route)
            .or_default()
            .entry(method)
            .or_default()
            .insert(status, template);
        self
    }

    pub fn template(
        &self,
        route: RouteKey,
        method: &Method,
        status: StatusCode,
    ) -> Option<&Template> {
        self.routes.get(&route)?.get(method)?.get(&status)
    }

    /// Renders the envelope for `(route, method, status)`. 500 envelopes always
    /// carry a timestamp, whether or not the table entry (or fallback) has one.
    pub fn render(
        &self,
        route: RouteKey,
        method: &Method,
        status: StatusCode,
        payload: Payload,
    ) -> Envelope {
        let mut envelope = match self.template(route, method, status) {
            Some(template) => template.render(payload),
            None => Envelope::unknown(status),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            envelope.stamp(render_timestamp());
        }
        envelope
    }

    /// Envelope for requests that matched no registered route.
    pub fn unmatched(&self, status: StatusCode) -> Envelope {
        let mut envelope = Envelope::unknown(status);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            envelope.stamp(render_timestamp());
        }
        envelope
    }

    /// The table served by the API.
    pub fn standard() -> Self {
        use RouteKey::*;

        const NOT_FOUND_BY_ID: &str = "Não foi encontrado produto com o ID informado.";
        const INVALID_ID: &str = "O ID informado é inválido.";
        const INVALID_PRODUCT: &str = "Dados do produto inválidos ou incompletos.";
        const DUPLICATE_SKU: &str = "Ja existe um produto com o código informado.";

        let ok = StatusCode::OK;
        let created = StatusCode::CREATED;
        let bad_request = StatusCode::BAD_REQUEST;
        let not_found = StatusCode::NOT_FOUND;
        let conflict = StatusCode::CONFLICT;
        let internal = StatusCode::INTERNAL_SERVER_ERROR;

        Self::new()
            .with(
                Root,
                Method::GET,
                ok,
                Template::Welcome {
                    api: API_NAME,
                    message: "Bem-vindo à JM-PRODUCTS-API.",
                    version: API_VERSION,
                },
            )
            // /products
            .with(Products, Method::GET, ok, collection("Produtos obtidos com sucesso."))
            .with(
                Products,
                Method::GET,
                internal,
                server_error("Não foi possivel obter os produtos."),
            )
            .with(Products, Method::POST, created, single("Produto criado com sucesso."))
            .with(
                Products,
                Method::POST,
                bad_request,
                error(ErrorCode::BadRequest, INVALID_PRODUCT),
            )
            .with(Products, Method::POST, conflict, error(ErrorCode::Conflict, DUPLICATE_SKU))
            .with(
                Products,
                Method::POST,
                internal,
                server_error("Não foi possivel criar o produto."),
            )
            // /products/:id
            .with(ProductById, Method::GET, ok, single("Produto obtido com sucesso."))
            .with(ProductById, Method::GET, bad_request, error(ErrorCode::BadRequest, INVALID_ID))
            .with(ProductById, Method::GET, not_found, error(ErrorCode::NotFound, NOT_FOUND_BY_ID))
            .with(
                ProductById,
                Method::GET,
                internal,
                server_error("Não foi possivel obter o produto."),
            )
            .with(ProductById, Method::PUT, ok, single("Produto atualizado com sucesso."))
            .with(
                ProductById,
                Method::PUT,
                bad_request,
                error(ErrorCode::BadRequest, INVALID_PRODUCT),
            )
            .with(ProductById, Method::PUT, not_found, error(ErrorCode::NotFound, NOT_FOUND_BY_ID))
            .with(ProductById, Method::PUT, conflict, error(ErrorCode::Conflict, DUPLICATE_SKU))
            .with(
                ProductById,
                Method::PUT,
                internal,
                server_error("Não foi possivel atualizar o produto."),
            )
            .with(ProductById, Method::DELETE, ok, single("Produto deletado com sucesso."))
            .with(
                ProductById,
                Method::DELETE,
                bad_request,
                error(ErrorCode::BadRequest, INVALID_ID),
            )
            .with(
                ProductById,
                Method::DELETE,
                not_found,
                error(ErrorCode::NotFound, NOT_FOUND_BY_ID),
            )
            .with(
                ProductById,
                Method::DELETE,
                internal,
                server_error("Não foi possivel deletar o produto."),
            )
            // /category/:name
            .with(ProductsByCategory, Method::GET, ok, collection("Produtos obtidos com sucesso."))
            .with(
                ProductsByCategory,
                Method::GET,
                bad_request,
                error(ErrorCode::BadRequest, "A categoria informada é inválida."),
            )
            .with(
                ProductsByCategory,
                Method::GET,
                not_found,
                error(
                    ErrorCode::NotFound,
                    "Não foram encontrados produtos com a categoria informada.",
                ),
            )
            .with(
                ProductsByCategory,
                Method::GET,
                internal,
                server_error("Não foi possivel obter os produtos."),
            )
    }
}

fn collection(message: &'static str) -> Template {
    Template::Collection { message }
}

fn single(message: &'static str) -> Template {
    Template::Single { message }
}

fn error(code: ErrorCode, message: &'static str) -> Template {
    Template::Error { code, message }
}

fn server_error(message: &'static str) -> Template {
    error(ErrorCode::InternalServerError, message)
}
