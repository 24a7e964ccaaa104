use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{self, Align, Color32, Frame, Layout, Margin, Rounding, Stroke, Vec2};
use posta::backend;
use posta::error::GENERIC_FAILURE;
use posta::logging::initialize_logging;
use posta::{Backend, ClientConfig, FromBackend, Route, ToBackend, ViewModel};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, Receiver, Sender};

mod draw;

type StartupResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// --- Stato dell'Applicazione GUI ---

struct PostaApp {
    // Tutto ciò che viene disegnato
    view: ViewModel,

    // Comunicazione
    to_backend_tx: Sender<ToBackend>,
    from_backend_rx: Receiver<FromBackend>,
    _runtime: Runtime,
}

impl PostaApp {
    fn new(cc: &eframe::CreationContext<'_>, config: ClientConfig) -> StartupResult<Self> {
        let (to_backend_tx, to_backend_rx) = mpsc::channel(32);
        let (from_backend_tx, from_backend_rx) = mpsc::channel(64);

        draw::configure_styles(&cc.egui_ctx);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let backend = Arc::new(Backend::from_config(&config)?);
        runtime.spawn(backend::run(
            backend,
            to_backend_rx,
            from_backend_tx,
            config.poll_interval,
        ));

        let mut app = Self {
            view: ViewModel::default(),
            to_backend_tx,
            from_backend_rx,
            _runtime: runtime,
        };
        app.send(ToBackend::Start);
        Ok(app)
    }

    fn send(&mut self, action: ToBackend) {
        match self.to_backend_tx.try_send(action) {
            Ok(()) => self.view.dispatched(),
            Err(e) => {
                tracing::warn!("Backend not accepting commands: {}", e);
                self.view.status.set(GENERIC_FAILURE);
            }
        }
    }

    fn handle_backend_messages(&mut self) {
        while let Ok(event) = self.from_backend_rx.try_recv() {
            self.view.apply(event);
        }
    }
}

impl eframe::App for PostaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_backend_messages();

        match self.view.route {
            Route::Login | Route::Register => self.draw_auth_view(ctx),
            Route::Inbox => self.draw_inbox_view(ctx),
            Route::Admin => self.draw_admin_view(ctx),
        }

        // Il poller consegna eventi anche senza input dell'utente
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

fn main() -> Result<(), eframe::Error> {
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("posta_client: {}", e);
            std::process::exit(1);
        }
    };
    initialize_logging(&config.log_dir);
    tracing::info!("Using messaging service at {}", config.api_base_url);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([820.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Posta",
        native_options,
        Box::new(move |cc| Ok(Box::new(PostaApp::new(cc, config)?))),
    )
}
