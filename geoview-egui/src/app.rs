//! The viewer application: url form, status line and the map.

use eframe::CreationContext;
use egui::{Key, TextEdit};
use geoview::config::ViewerConfig;
use geoview::loader::{Dispatcher, HttpDataSource};
use geoview::state::LoadStatus;
use geoview::{Dataset, LoadController, Messenger, Viewport, ViewerState};
use serde::{Deserialize, Serialize};

use crate::map_widget::MapState;

const STORAGE_KEY: &str = "geoview";
const URL_HINT: &str = "https://example.com/data.csv";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppStorage {
    input_url: String,
    viewport: Viewport,
}

/// Wakes up the UI when a load completes on the async runtime.
struct EguiMessenger {
    context: egui::Context,
}

impl Messenger for EguiMessenger {
    fn request_redraw(&self) {
        log::trace!("Redraw requested");
        self.context.request_repaint();
    }
}

/// Eframe application of the viewer.
pub struct GeoviewApp {
    state: ViewerState,
    loads: LoadController<HttpDataSource>,
    map: MapState,
}

impl GeoviewApp {
    /// Creates the application, restoring the url field and the viewport of the previous session.
    ///
    /// If the configuration has an initial url, its load is started right away.
    pub fn new(cc: &CreationContext<'_>, config: ViewerConfig) -> Self {
        let AppStorage {
            input_url,
            viewport,
        } = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, STORAGE_KEY))
            .unwrap_or_default();

        let loads = LoadController::new(Dispatcher::new(HttpDataSource::new())).with_messenger(
            EguiMessenger {
                context: cc.egui_ctx.clone(),
            },
        );

        let mut app = Self {
            state: ViewerState::restored(input_url, viewport),
            loads,
            map: MapState::new(config.base_map(), cc.egui_ctx.clone()),
        };

        if let Some(url) = config.initial_url {
            app.state.set_input_url(url);
            app.submit();
        }

        app
    }

    fn submit(&mut self) {
        if let Err(err) = self.loads.submit(&mut self.state) {
            log::warn!("Url rejected: {err}");
        }
    }

    fn show_form(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let mut input = self.state.input_url().to_string();
            let field = ui.add(
                TextEdit::singleline(&mut input)
                    .hint_text(URL_HINT)
                    .desired_width(ui.available_width() - 60.0),
            );
            if field.changed() {
                self.state.set_input_url(input);
            }

            let entered = field.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
            let clicked = ui
                .add_enabled(!self.state.input_url().trim().is_empty(), egui::Button::new("Add"))
                .clicked();

            if entered || clicked {
                self.submit();
            }
        });

        match self.state.status() {
            LoadStatus::Loading(url) => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(format!("Loading {url}"));
                });
            }
            LoadStatus::Rejected(err) => {
                ui.colored_label(ui.visuals().error_fg_color, err.to_string());
            }
            LoadStatus::Idle => {
                if let Some(summary) = dataset_summary(&self.state) {
                    ui.label(summary);
                }
            }
        }
    }
}

impl eframe::App for GeoviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.loads.poll(&mut self.state);

        egui::TopBottomPanel::top("url_form").show(ctx, |ui| {
            ui.add_space(4.0);
            self.show_form(ui);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::default())
            .show(ctx, |ui| {
                let layers = self.state.layers();
                let viewport = self.state.viewport();
                if let Some(viewport) = self.map.show(ui, &viewport, &layers) {
                    self.state.viewport_changed(viewport);
                }
            });
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(
            storage,
            STORAGE_KEY,
            &AppStorage {
                input_url: self.state.input_url().to_string(),
                viewport: self.state.viewport(),
            },
        );
    }
}

fn dataset_summary(state: &ViewerState) -> Option<String> {
    let summary = match state.dataset()?.as_ref() {
        Dataset::Points(table) => format!("{} records", table.len()),
        Dataset::Features(collection) => format!("{} features", collection.features.len()),
    };

    Some(summary)
}
