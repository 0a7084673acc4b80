//! Clockwork entry point
//!
//! Handles platform-specific initialization and runs the frame loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, KeyboardEvent};

    use clockwork::clock::SystemClock;
    use clockwork::consts::SIM_DT;
    use clockwork::renderer::{CanvasSink, DrawStyle, Frame, RenderSink};
    use clockwork::sim::{SimEvent, Simulator, TickInput};
    use clockwork::{Preset, SimConfig};

    /// Arrow keys currently held
    #[derive(Default)]
    struct Arrows {
        up: bool,
        down: bool,
        left: bool,
        right: bool,
    }

    impl Arrows {
        fn direction(&self) -> Vec2 {
            let axis = |neg: bool, pos: bool| (pos as i32 - neg as i32) as f32;
            Vec2::new(axis(self.left, self.right), axis(self.up, self.down))
        }
    }

    /// App instance holding all state
    struct App {
        sim: Simulator,
        sink: CanvasSink,
        input: TickInput,
        arrows: Arrows,
        last_time: f64,
    }

    impl App {
        fn new(config: SimConfig, canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
            let style = DrawStyle::for_preset(config.preset);
            let bounds = config.bounds;
            let sim = Simulator::new(config, Box::new(SystemClock)).map_err(to_js)?;
            let sink = CanvasSink::new(canvas, style, bounds).map_err(to_js)?;
            Ok(Self {
                sim,
                sink,
                input: TickInput::default(),
                arrows: Arrows::default(),
                last_time: 0.0,
            })
        }

        /// Rebuild the simulator for another preset, keeping the canvas
        fn switch_preset(&mut self, preset: Preset) {
            let config = SimConfig::from_preset(preset);
            match Simulator::new(config.clone(), Box::new(SystemClock)) {
                Ok(sim) => {
                    self.sim = sim;
                    self.sink.set_style(DrawStyle::for_preset(preset));
                    self.sink.resize(config.bounds);
                    config.save();
                    // Show digits right away instead of waiting for the timer
                    self.sim.schedule_clock_tick();
                    log::info!("Switched to preset {}", preset.as_str());
                }
                Err(e) => log::error!("Cannot switch preset: {}", e),
            }
        }

        fn update(&mut self, dt: f32) {
            self.input.gravity = self.arrows.direction();
            self.sim.advance(dt.min(0.1), &self.input);

            for event in self.sim.drain_events() {
                match event {
                    SimEvent::PoolExhausted { group, unfilled, .. } => {
                        log::warn!("Group {} short {} particles", group, unfilled)
                    }
                    SimEvent::LayoutFallback { group, reason } => {
                        log::warn!("Group {} layout fallback: {}", group, reason)
                    }
                    SimEvent::StageChanged { group, from, to } => {
                        log::debug!("Group {} {} -> {}", group, from.name(), to.name())
                    }
                    _ => {}
                }
            }
        }

        fn render(&mut self) {
            if let Err(e) = self.sink.render(&Frame::capture(&self.sim)) {
                log::warn!("Render error: {}", e);
            }
        }
    }

    fn to_js(e: clockwork::SimError) -> JsValue {
        JsValue::from_str(&e.to_string())
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Clockwork starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        let dpr = window.device_pixel_ratio();
        canvas.set_width((canvas.client_width() as f64 * dpr) as u32);
        canvas.set_height((canvas.client_height() as f64 * dpr) as u32);

        let mut config = SimConfig::load();
        config.seed = js_sys::Date::now() as u64;
        log::info!("Simulation seeded with: {}", config.seed);
        let app = Rc::new(RefCell::new(App::new(config, canvas)?));
        app.borrow_mut().sim.schedule_clock_tick();

        setup_input_handlers(app.clone())?;
        setup_clock_timer(app.clone())?;

        request_animation_frame(app);

        log::info!("Clockwork running!");
        Ok(())
    }

    fn setup_input_handlers(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;

        // Key down
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut a = app.borrow_mut();
                match event.key().as_str() {
                    "w" | "W" => a.input.accelerate = true,
                    "s" | "S" => a.input.decelerate = true,
                    "ArrowUp" => a.arrows.up = true,
                    "ArrowDown" => a.arrows.down = true,
                    "ArrowLeft" => a.arrows.left = true,
                    "ArrowRight" => a.arrows.right = true,
                    "r" | "R" => {
                        let bounds = a.sim.bounds();
                        a.sim.reset(bounds);
                        a.sim.schedule_clock_tick();
                    }
                    "h" | "H" => a.sink.show_hud = !a.sink.show_hud,
                    "1" => a.switch_preset(Preset::Planets),
                    "2" => a.switch_preset(Preset::DigitGrid),
                    _ => return,
                }
                event.prevent_default();
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Key up
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut a = app.borrow_mut();
                match event.key().as_str() {
                    "w" | "W" => a.input.accelerate = false,
                    "s" | "S" => a.input.decelerate = false,
                    "ArrowUp" => a.arrows.up = false,
                    "ArrowDown" => a.arrows.down = false,
                    "ArrowLeft" => a.arrows.left = false,
                    "ArrowRight" => a.arrows.right = false,
                    _ => {}
                }
            });
            window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    /// Clock ticks come from a 1 Hz interval, not from the frame loop
    fn setup_clock_timer(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let closure = Closure::<dyn FnMut()>::new(move || {
            app.borrow_mut().sim.schedule_clock_tick();
        });
        window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            1000,
        )?;
        closure.forget();
        Ok(())
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            frame_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame_loop(app: Rc<RefCell<App>>, time: f64) {
        {
            let mut a = app.borrow_mut();

            let dt = if a.last_time > 0.0 {
                ((time - a.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            a.last_time = time;

            a.update(dt);
            a.render();
        }

        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_app::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Headless run: `clockwork [preset | config.json] [HH:MM:SS] [seconds]`
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = native::run(std::env::args().skip(1).collect()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use clockwork::clock::{ClockTime, ManualClock, SystemClock, TimeSource};
    use clockwork::consts::SIM_DT;
    use clockwork::sim::{SimEvent, Simulator, TickInput};
    use clockwork::{Preset, Result, SimConfig};

    pub fn run(args: Vec<String>) -> Result<()> {
        let config = match args.first() {
            Some(arg) if arg.ends_with(".json") => SimConfig::from_file(arg)?,
            Some(arg) => match Preset::from_str(arg) {
                Some(preset) => SimConfig::from_preset(preset),
                None => {
                    log::warn!("Unknown preset {:?}, using default", arg);
                    SimConfig::default()
                }
            },
            None => SimConfig::default(),
        };

        let source: Box<dyn TimeSource> = match args.get(1) {
            Some(time) => Box::new(ManualClock::new(ClockTime::parse(time)?)),
            None => Box::new(SystemClock),
        };
        let seconds: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);

        log::info!(
            "Clockwork (native, headless) running {} preset for {}s",
            config.preset.as_str(),
            seconds
        );

        let pool_count = config.pools.len();
        let mut sim = Simulator::new(config, source)?;
        let input = TickInput::default();
        let frames = seconds * 60;

        for frame in 0..frames {
            sim.update_clock(SIM_DT);
            sim.advance(SIM_DT, &input);

            for event in sim.drain_events() {
                match event {
                    SimEvent::Captured { .. } | SimEvent::Released { .. } => {
                        log::trace!("{:?}", event)
                    }
                    _ => log::info!("{:?}", event),
                }
            }

            if frame % 60 == 59 {
                let time = sim.time().map(|t| t.to_string()).unwrap_or_default();
                for pool in 0..pool_count {
                    let counts = sim.pool_counts(pool)?;
                    log::info!(
                        "{} pool {}: free {} assigned {} consumed {} freed {}",
                        time,
                        sim.pools()[pool].name,
                        counts.free,
                        counts.assigned,
                        counts.consumed,
                        counts.freed
                    );
                }
            }
        }
        Ok(())
    }
}
