use crate::{
    api::{attendance, pay_items},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct RateLimits {
    login: Limiter,
    refresh: Limiter,
    protected: Limiter,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("Invalid rate limit: {requests_per_min}/min"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: RateLimits) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limits.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limits.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limits.login)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(limits.protected)
            .service(
                web::scope("/attendance")
                    .service(web::resource("/sync").route(web::post().to(attendance::sync)))
                    .service(
                        web::resource("/punches").route(web::post().to(attendance::upload_punches)),
                    )
                    .service(
                        web::resource("/processed")
                            .route(web::get().to(attendance::list_processed)),
                    )
                    .service(
                        web::resource("/processed/post")
                            .route(web::post().to(attendance::post_processed)),
                    )
                    .service(
                        web::resource("/processed/unpost")
                            .route(web::post().to(attendance::unpost_processed)),
                    )
                    // /attendance/processed/{id}
                    .service(
                        web::resource("/processed/{id}")
                            .route(web::put().to(attendance::edit_processed)),
                    ),
            )
            // /benefits/... and /deductions/...
            .service(
                web::scope("/{kind:benefits|deductions}")
                    .service(web::resource("/post").route(web::post().to(pay_items::post_pay_items)))
                    .service(
                        web::resource("/unpost").route(web::post().to(pay_items::unpost_pay_items)),
                    )
                    .service(
                        web::resource("/{id}").route(web::put().to(pay_items::update_pay_item)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// SYNC
//  └─ POST {api_prefix}/attendance/sync  (HR / Payroll / Admin)
//       └─ processed_attendances upserted, posted rows untouched
