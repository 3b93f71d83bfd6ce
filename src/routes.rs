use crate::{
    api::{
        academic,
        attendance::{self, AttendanceBackend},
        cerapan, settings, user,
    },
    auth::{
        handlers,
        middleware::{auth_middleware, ip_allow_middleware},
    },
    config::Config,
    error::AppError,
    store::MySqlStore,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{Scope, error::JsonPayloadError, middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Rate limiters shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    protected: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    if requests_per_min == 0 {
        return Err(anyhow!("Rate limit must be at least 1 request per minute"));
    }
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("Invalid rate limit of {requests_per_min}/min"))?;

    Ok(Governor::new(&cfg))
}

/// Malformed JSON bodies surface as VALIDATION instead of actix's plain-text 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = match &err {
            JsonPayloadError::ContentType => "Expected a JSON body".to_string(),
            other => other.to_string(),
        };
        AppError::BadRequest(message).into()
    })
}

/// `/attendance` routes over any storage backend.
pub fn attendance_scope<S: AttendanceBackend>() -> Scope {
    web::scope("/attendance")
        .service(
            web::resource("/clockin")
                .wrap(from_fn(ip_allow_middleware))
                .route(web::post().to(attendance::clock_in::<S>)),
        )
        .service(
            web::resource("/clockout")
                .wrap(from_fn(ip_allow_middleware))
                .route(web::put().to(attendance::clock_out::<S>)),
        )
        .service(web::resource("/manual").route(web::post().to(attendance::manual_entry::<S>)))
        .service(web::resource("/all").route(web::get().to(attendance::list_all::<S>)))
        // fixed segments before /{user_id}
        .service(web::resource("/report").route(web::get().to(attendance::report::<S>)))
        .service(
            web::resource("/record/{id}").route(web::delete().to(attendance::delete_record::<S>)),
        )
        .service(
            web::resource("/{user_id}/today").route(web::get().to(attendance::today::<S>)),
        )
        .service(
            web::resource("/{user_id}").route(web::get().to(attendance::list_for_user::<S>)),
        )
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            // decodes the bearer token itself through the AuthUser extractor
            .service(web::resource("/me").route(web::get().to(handlers::me))),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware::<MySqlStore>))
            .wrap(limiters.protected.clone())
            .service(attendance_scope::<MySqlStore>())
            .service(
                web::resource("/school-setting")
                    .route(web::get().to(settings::get_settings))
                    .route(web::put().to(settings::update_settings)),
            )
            .service(
                web::scope("/cerapan")
                    .service(
                        web::resource("/tasks")
                            .route(web::post().to(cerapan::create_task))
                            .route(web::get().to(cerapan::list_tasks)),
                    )
                    .service(
                        web::resource("/tasks/{id}/report")
                            .route(web::post().to(cerapan::submit_report))
                            .route(web::get().to(cerapan::get_report)),
                    ),
            )
            .service(
                web::scope("/users")
                    .service(
                        web::resource("")
                            .route(web::post().to(user::create_user))
                            .route(web::get().to(user::list_users)),
                    )
                    // before /{id} so "me" is not parsed as an id
                    .service(web::resource("/me").route(web::put().to(user::update_me)))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(user::get_user))
                            .route(web::put().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            )
            .service(
                web::scope("/classes")
                    .service(
                        web::resource("")
                            .route(web::post().to(academic::create_class))
                            .route(web::get().to(academic::list_classes)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(academic::update_class))
                            .route(web::delete().to(academic::delete_class)),
                    ),
            )
            .service(
                web::scope("/subjects")
                    .service(
                        web::resource("")
                            .route(web::post().to(academic::create_subject))
                            .route(web::get().to(academic::list_subjects)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(academic::update_subject))
                            .route(web::delete().to(academic::delete_subject)),
                    ),
            )
            .service(
                web::scope("/assignments")
                    .service(
                        web::resource("")
                            .route(web::post().to(academic::create_assignment))
                            .route(web::get().to(academic::list_assignments)),
                    )
                    .service(
                        web::resource("/{id}").route(web::delete().to(academic::delete_assignment)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_limit_is_rejected() {
        assert!(build_limiter(0).is_err());
        assert!(build_limiter(60).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }
}
