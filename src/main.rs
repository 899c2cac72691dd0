use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use sibu::application::ports::{ConversationRepository, ModelService};
use sibu::application::services::{ContinuationService, FileBindingService, RunEngine};
use sibu::infrastructure::llm::{MockModelService, OpenAiModelService};
use sibu::infrastructure::observability::{TracingConfig, init_tracing};
use sibu::infrastructure::persistence::{InMemoryConversationRepository, PgConversationRepository};
use sibu::presentation::config::Settings;
use sibu::presentation::{AppState, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env();

    init_tracing(
        TracingConfig {
            environment: settings.environment.to_string(),
            ..TracingConfig::default()
        },
        settings.server.port,
    );

    let repository: Arc<dyn ConversationRepository> = match (
        settings.scaffold.enabled,
        settings.database.url.as_deref(),
    ) {
        (false, Some(url)) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await?;
            Arc::new(PgConversationRepository::new(pool))
        }
        _ => {
            tracing::warn!("No database configured, conversations are held in memory");
            Arc::new(InMemoryConversationRepository::new())
        }
    };

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    if settings.scaffold.enabled {
        let router = build_router(Arc::new(MockModelService), repository, settings);
        axum::serve(listener, router).await?;
    } else {
        let model_service = Arc::new(OpenAiModelService::new(&settings.llm));
        let router = build_router(model_service, repository, settings);
        axum::serve(listener, router).await?;
    }

    Ok(())
}

fn build_router<M>(
    model_service: Arc<M>,
    repository: Arc<dyn ConversationRepository>,
    settings: Settings,
) -> axum::Router
where
    M: ModelService + 'static,
{
    let engine = RunEngine::new(
        Arc::clone(&model_service),
        settings.llm.system_prompt.clone(),
        settings.llm.run_poll_max_attempts,
        Duration::from_millis(settings.llm.run_poll_interval_ms),
    );

    let continuation_service = Arc::new(ContinuationService::new(Arc::clone(&repository), engine));
    let file_binding_service = Arc::new(FileBindingService::new(
        Arc::clone(&repository),
        model_service,
    ));

    create_router(AppState {
        continuation_service,
        file_binding_service,
        conversation_repository: repository,
        settings,
    })
}
