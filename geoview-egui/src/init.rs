use eframe::AppCreator;
use geoview::config::ViewerConfig;

use crate::GeoviewApp;

const APP_TITLE: &str = "GeoView";

/// Starts the viewer on the current platform.
///
/// On native platforms this sets up logging and the async runtime and then blocks until the
/// window is closed. In the browser the app is attached to the `the_canvas_id` canvas element.
#[derive(Default)]
pub struct InitBuilder {
    config: Option<ViewerConfig>,
    #[cfg(not(target_arch = "wasm32"))]
    native_options: Option<eframe::NativeOptions>,
    #[cfg(target_arch = "wasm32")]
    web_options: Option<eframe::WebOptions>,
}

impl InitBuilder {
    /// Creates a builder that reads the configuration from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given configuration instead of reading it from the environment.
    pub fn with_config(mut self, config: ViewerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets options of the native window.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_native_options(mut self, options: eframe::NativeOptions) -> Self {
        self.native_options = Some(options);
        self
    }

    /// Sets options of the web runner.
    #[cfg(target_arch = "wasm32")]
    pub fn with_web_options(mut self, options: eframe::WebOptions) -> Self {
        self.web_options = Some(options);
        self
    }

    /// Runs the viewer.
    pub fn init(self) -> eframe::Result {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.init_not_wasm()
        }

        #[cfg(target_arch = "wasm32")]
        {
            self.init_wasm()
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn init_not_wasm(self) -> eframe::Result {
        use std::time::Duration;

        use tokio::runtime::Runtime;

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        let rt = Runtime::new().map_err(|err| eframe::Error::AppCreation(Box::new(err)))?;
        let _enter = rt.enter();

        std::thread::spawn(move || {
            rt.block_on(async {
                loop {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
            })
        });

        let config = self.config.unwrap_or_else(ViewerConfig::from_env);
        let native_options = self.native_options.unwrap_or_default();

        eframe::run_native(APP_TITLE, native_options, app_creator(config))
    }

    #[cfg(target_arch = "wasm32")]
    fn init_wasm(self) -> eframe::Result {
        use eframe::wasm_bindgen::JsCast as _;

        eframe::WebLogger::init(log::LevelFilter::Info).ok();

        let config = self.config.unwrap_or_else(ViewerConfig::from_env);
        let web_options = self.web_options.unwrap_or_default();

        wasm_bindgen_futures::spawn_local(async move {
            let Some(document) = web_sys::window().and_then(|window| window.document()) else {
                log::error!("No document to attach the viewer to");
                return;
            };

            let Some(canvas) = document
                .get_element_by_id("the_canvas_id")
                .and_then(|element| element.dyn_into::<web_sys::HtmlCanvasElement>().ok())
            else {
                log::error!("Canvas element the_canvas_id not found");
                return;
            };

            let start_result = eframe::WebRunner::new()
                .start(canvas, web_options, app_creator(config))
                .await;

            if let Some(loading_text) = document.get_element_by_id("loading_text") {
                match start_result {
                    Ok(_) => {
                        loading_text.remove();
                    }
                    Err(err) => {
                        loading_text.set_inner_html(
                            "<p> The app has crashed. See the developer console for details. </p>",
                        );
                        log::error!("Failed to start eframe: {err:?}");
                    }
                }
            }
        });

        Ok(())
    }
}

fn app_creator<'app>(config: ViewerConfig) -> AppCreator<'app> {
    Box::new(move |cc: &eframe::CreationContext<'_>| Ok(Box::new(GeoviewApp::new(cc, config))))
}
