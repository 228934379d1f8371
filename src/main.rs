use actix_oauth_agent::{
    config::OAuthAgentConfiguration, middleware::RequestLog, route::agent_scope,
    token::TokenClient,
};
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use env_logger::Env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let configuration = OAuthAgentConfiguration::from_env()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    let port = configuration.port;
    let prefix = configuration.endpoints_prefix.clone();

    let configuration = web::Data::new(configuration);
    let token_client = web::Data::new(TokenClient::new());

    log::info!("OAuth Agent listening on port {port} under {prefix}");

    HttpServer::new(move || {
        App::new()
            .app_data(configuration.clone())
            .app_data(token_client.clone())
            .wrap(RequestLog::new())
            .service(agent_scope(&prefix))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
