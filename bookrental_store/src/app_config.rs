use actix_web::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::resource("/{collection}")
                .route(web::get().to(handlers::list_documents))
                .route(web::post().to(handlers::create_document)),
        )
        .service(
            web::resource("/{collection}/{id}")
                .route(web::get().to(handlers::get_document))
                .route(web::patch().to(handlers::patch_document))
                .route(web::delete().to(handlers::delete_document)),
        );
}
