use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use eframe::egui;

use crop_snap::CropError;
use crop_snap::editor::{EditorKey, EditorRequest, Modifiers, RectangleEditor};
use crop_snap::geometry::{CropRect, ImageSize, describe_rect};
use crop_snap::handle::Handle;
use crop_snap::library::{CropLibrary, FileEntry, FsLibrary};
use crop_snap::session::{ImageQueue, StatusLine};
use crop_snap::settings::{self, PersistedSettings, SnapSettings};

const PADDING: f32 = 20.0;
const HANDLE_RADIUS: f32 = 5.0;
const THUMB_SIZE: u32 = 64;
// decoding is synchronous, so spread a big folder over several frames
const THUMBS_PER_FRAME: usize = 2;

type SaveResult = Result<Vec<FileEntry>, CropError>;

/// A save batch on the worker thread and the image it belongs to.
struct PendingSave {
    image: PathBuf,
    result: Receiver<SaveResult>,
}

pub struct CropperApp {
    library: Arc<dyn CropLibrary>,
    queue: ImageQueue,
    texture: Option<egui::TextureHandle>,
    editor: RectangleEditor,
    /// Raw values behind the settings widgets; what gets persisted.
    persisted: PersistedSettings,
    snap: SnapSettings,
    settings_written: bool,
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    crops: Vec<FileEntry>,
    thumbnails: HashMap<PathBuf, Option<egui::TextureHandle>>,
    thumbs_loaded: usize,
    status: StatusLine,
    /// No pointer input is dispatched and no other image is shown while set.
    pending_save: Option<PendingSave>,
    resize_key_down: bool,
    had_focus: bool,
}

impl CropperApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let persisted = cc
            .storage
            .map(|storage| settings::read_settings(storage))
            .unwrap_or_default();
        let snap = SnapSettings::from_persisted(&persisted);
        let mut status = StatusLine::default();
        status.set_outcome("Load a folder to start");
        Self {
            library: Arc::new(FsLibrary),
            queue: ImageQueue::default(),
            texture: None,
            editor: RectangleEditor::new(),
            persisted,
            snap,
            settings_written: false,
            input_dir: None,
            output_dir: None,
            crops: Vec::new(),
            thumbnails: HashMap::new(),
            thumbs_loaded: 0,
            status,
            pending_save: None,
            resize_key_down: false,
            had_focus: true,
        }
    }

    /// Write the repaired settings back once storage is writable.
    fn write_back_settings(&mut self, frame: &mut eframe::Frame) {
        if self.settings_written {
            return;
        }
        if let Some(storage) = frame.storage_mut() {
            settings::save_settings(storage, &self.persisted);
        }
        self.settings_written = true;
    }

    fn load_folder(&mut self, ctx: &egui::Context) {
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };
        match self.library.list_images(&dir) {
            Ok(images) => {
                log::info!("Loaded {} image(s) from {}", images.len(), dir.display());
                self.queue.replace(images);
                if self.output_dir.is_none() {
                    self.output_dir = Some(dir.clone());
                }
                self.input_dir = Some(dir);
                self.show_current(ctx);
                self.refresh_crops();
            }
            Err(err) => {
                log::error!("{err}");
                self.status.set_outcome(err.to_string());
            }
        }
    }

    fn choose_output(&mut self) {
        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
            self.output_dir = Some(dir);
            self.refresh_crops();
        }
    }

    fn refresh_crops(&mut self) {
        let Some(dir) = &self.output_dir else {
            self.crops.clear();
            return;
        };
        match self.library.list_crops(dir) {
            Ok(crops) => self.crops = crops,
            Err(err) => {
                log::error!("{err}");
                self.status.set_outcome(err.to_string());
            }
        }
    }

    /// Load the queue's current image into the canvas and the editor.
    fn show_current(&mut self, ctx: &egui::Context) {
        self.texture = None;
        let Some(entry) = self.queue.current().cloned() else {
            self.editor.load_image(ImageSize::default());
            self.status.set_image(None);
            return;
        };
        self.status.set_image(Some(entry.name.clone()));

        match image::open(&entry.path) {
            Ok(image) => {
                let size = [image.width() as _, image.height() as _];
                let image_buffer = image.to_rgba8();
                let pixels = image_buffer.as_flat_samples();
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
                self.texture =
                    Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
                let natural = match self.library.read_decoded_size(&entry.path) {
                    Ok(dims) => ImageSize::new(dims.width as f32, dims.height as f32),
                    Err(_) => ImageSize::new(image.width() as f32, image.height() as f32),
                };
                self.editor.load_image(natural);
            }
            Err(err) => {
                log::error!("Failed to open {}: {err}", entry.path.display());
                self.editor.load_image(ImageSize::default());
                self.status.set_outcome(format!("Could not open {}", entry.name));
            }
        }
    }

    /// Save the current selections (if any), then move on to the next image
    /// once the batch has finished.
    fn accept(&mut self, ctx: &egui::Context) {
        if self.pending_save.is_some() {
            return;
        }
        let Some(entry) = self.queue.current().cloned() else {
            return;
        };
        let Some(output_dir) = self.output_dir.clone().or_else(|| self.input_dir.clone()) else {
            self.status.set_outcome("Select an output folder first.");
            return;
        };

        let rects: Vec<CropRect> = self.editor.selections().to_vec();
        if rects.is_empty() {
            self.advance(ctx, &entry.path);
            return;
        }

        let (tx, rx) = mpsc::channel();
        let library = Arc::clone(&self.library);
        let image = entry.path.clone();
        thread::spawn(move || {
            let result = library.save_crops(&image, &rects, &output_dir);
            let _ = tx.send(result);
        });
        self.editor.on_focus_lost();
        self.pending_save = Some(PendingSave {
            image: entry.path,
            result: rx,
        });
        self.status.set_outcome("Saving…");
    }

    fn skip(&mut self, ctx: &egui::Context) {
        if self.pending_save.is_some() {
            return;
        }
        self.editor.reset_selections();
        self.accept(ctx);
    }

    fn poll_save(&mut self, ctx: &egui::Context) {
        let Some(pending) = &self.pending_save else {
            return;
        };
        let outcome = match pending.result.try_recv() {
            Ok(Ok(saved)) => {
                if !saved.is_empty() {
                    self.refresh_crops();
                }
                format!("Saved {} crop(s)", saved.len())
            }
            Ok(Err(err)) => {
                log::error!("{err}");
                format!("Saving failed: {err}")
            }
            Err(TryRecvError::Empty) => {
                ctx.request_repaint_after(Duration::from_millis(50));
                return;
            }
            Err(TryRecvError::Disconnected) => {
                log::error!("Save worker exited without reporting");
                String::from("Saving failed")
            }
        };

        let Some(pending) = self.pending_save.take() else {
            return;
        };
        self.status.set_outcome(outcome);
        self.advance(ctx, &pending.image);
    }

    /// Drop a finished image from the queue and show whatever replaces it.
    fn advance(&mut self, ctx: &egui::Context, image: &Path) {
        if self.queue.finish(image) {
            self.show_current(ctx);
        }
    }

    fn delete_crop(&mut self, path: PathBuf) {
        match self.library.delete_crop(&path) {
            Ok(()) => {
                self.thumbnails.remove(&path);
                self.status.set_outcome(format!("Deleted {}", path.display()));
                self.refresh_crops();
            }
            Err(err) => {
                log::error!("{err}");
                self.status.set_outcome(err.to_string());
            }
        }
    }

    /// Cached thumbnail texture; decodes a few new ones per frame.
    fn thumbnail(&mut self, ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
        if let Some(cached) = self.thumbnails.get(path) {
            return cached.clone();
        }
        if self.thumbs_loaded >= THUMBS_PER_FRAME {
            ctx.request_repaint();
            return None;
        }
        self.thumbs_loaded += 1;

        let texture = match self.library.read_thumbnail(path, THUMB_SIZE) {
            Ok(thumb) => {
                let size = [thumb.width() as _, thumb.height() as _];
                let color_image =
                    egui::ColorImage::from_rgba_unmultiplied(size, thumb.as_flat_samples().as_slice());
                Some(ctx.load_texture(
                    path.display().to_string(),
                    color_image,
                    egui::TextureOptions::LINEAR,
                ))
            }
            Err(err) => {
                log::warn!("No thumbnail: {err}");
                None
            }
        };
        self.thumbnails.insert(path.to_path_buf(), texture.clone());
        texture
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let (alt, enter, escape, focused) = ctx.input(|i| {
            (
                i.modifiers.alt,
                i.key_pressed(egui::Key::Enter),
                i.key_pressed(egui::Key::Escape),
                i.focused,
            )
        });

        if alt != self.resize_key_down {
            self.resize_key_down = alt;
            if alt {
                self.editor.on_key_down(EditorKey::ResizeModifier);
            } else {
                self.editor.on_key_up(EditorKey::ResizeModifier);
            }
        }
        if enter
            && !ctx.wants_keyboard_input()
            && self.editor.on_key_down(EditorKey::Accept) == Some(EditorRequest::Accept)
        {
            self.accept(ctx);
        }
        if escape {
            self.editor.on_key_down(EditorKey::Clear);
        }
        if self.had_focus && !focused {
            self.editor.on_focus_lost();
        }
        self.had_focus = focused;
    }

    fn dispatch_pointer(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let (pressed, released, moving, double, latest, origin, ctrl) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.is_moving(),
                i.pointer.button_double_clicked(egui::PointerButton::Primary),
                i.pointer.latest_pos(),
                i.pointer.press_origin(),
                i.modifiers.ctrl || i.modifiers.command,
            )
        });

        if pressed && response.hovered() {
            if let Some(pos) = origin.or(latest) {
                self.editor
                    .on_pointer_down(pos, Modifiers { move_held: ctrl });
            }
        }
        if let Some(pos) = latest {
            if moving {
                self.editor.on_pointer_move(pos, &self.snap);
            }
            if released {
                self.editor.on_pointer_up(pos, &self.snap);
            }
            if double && response.hovered() {
                self.editor.on_double_click(pos);
            }
        }
        if response.secondary_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.editor.on_context_delete(pos);
            }
        }
    }

    fn settings_ui(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;
        changed |= ui
            .checkbox(&mut self.persisted.snap_resolution, "Snap to resolution buckets")
            .changed();
        changed |= ui
            .checkbox(&mut self.persisted.snap_aspect, "Snap to aspect ratios")
            .changed();
        ui.label("Buckets");
        changed |= ui
            .text_edit_singleline(&mut self.persisted.bucket_text)
            .lost_focus();
        ui.label("Aspect ratios");
        changed |= ui
            .text_edit_singleline(&mut self.persisted.aspect_text)
            .lost_focus();
        changed |= ui
            .add(egui::Slider::new(&mut self.persisted.snap_strength, 0.0..=1.0).text("Strength"))
            .changed();

        if changed {
            self.snap = SnapSettings::from_persisted(&self.persisted);
            log::debug!("snap settings now {:?}", self.snap);
        }
    }

    fn crops_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading(format!("Crops ({})", self.crops.len()));
        let crops = self.crops.clone();
        let mut to_delete = None;
        egui::ScrollArea::vertical()
            .id_salt("crop_list")
            .show(ui, |ui| {
                for crop in &crops {
                    let thumb = self.thumbnail(ctx, &crop.path);
                    let row = ui.horizontal(|ui| {
                        if let Some(thumb) = &thumb {
                            ui.add(thumbnail_image(thumb));
                        }
                        ui.label(&crop.name);
                    });
                    row.response
                        .interact(egui::Sense::click())
                        .context_menu(|ui| {
                            if ui.button("Delete crop").clicked() {
                                to_delete = Some(crop.path.clone());
                                ui.close_menu();
                            }
                        });
                }
            });
        if let Some(path) = to_delete {
            self.delete_crop(path);
        }
    }

    fn library_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading(format!("Library ({})", self.queue.images().len()));
        let images = self.queue.images().to_vec();
        let current = self.queue.current_index();
        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("image_list")
            .show(ui, |ui| {
                for (index, entry) in images.iter().enumerate() {
                    let thumb = self.thumbnail(ctx, &entry.path);
                    ui.horizontal(|ui| {
                        if let Some(thumb) = &thumb {
                            ui.add(thumbnail_image(thumb));
                        }
                        if ui
                            .selectable_label(current == Some(index), &entry.name)
                            .clicked()
                        {
                            clicked = Some(index);
                        }
                    });
                }
            });
        if let Some(index) = clicked {
            if self.pending_save.is_none() && self.queue.select(index) {
                self.show_current(ctx);
            }
        }
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let Some(texture) = self.texture.clone() else {
            ui.centered_and_justified(|ui| ui.label("No image loaded"));
            return;
        };

        let available_size = ui.available_size();
        let max_size = available_size - egui::vec2(PADDING * 2.0, PADDING * 2.0);
        let image_size = texture.size_vec2();

        // Fit within available space while keeping the aspect ratio
        let scale = (max_size.x / image_size.x).min(max_size.y / image_size.y);
        let display_size = image_size * scale;
        let total_display_size = display_size + egui::vec2(PADDING * 2.0, PADDING * 2.0);

        let x_offset = (available_size.x - total_display_size.x) / 2.0;
        let y_offset = (available_size.y - total_display_size.y) / 2.0;
        let start_pos = ui.cursor().min + egui::vec2(x_offset.max(0.0), y_offset.max(0.0));
        let overlay = egui::Rect::from_min_size(start_pos, total_display_size);

        let response = ui.allocate_rect(overlay, egui::Sense::click_and_drag());
        let painter = ui.painter_at(overlay);
        let image_rect =
            egui::Rect::from_min_size(overlay.min + egui::vec2(PADDING, PADDING), display_size);

        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        self.editor.set_image_rect(image_rect);
        if self.pending_save.is_none() {
            self.dispatch_pointer(ctx, &response);
        }

        let resize_mode = self.editor.resize_mode();
        for rect in self.editor.selections() {
            paint_rect(&painter, overlay, &self.editor, rect, false, resize_mode);
        }
        if let Some(live) = self.editor.live_rect() {
            paint_rect(&painter, overlay, &self.editor, live, true, resize_mode);
        }
        if resize_mode {
            painter.text(
                overlay.left_top() + egui::vec2(PADDING, 2.0),
                egui::Align2::LEFT_TOP,
                "Alt: drag handles to resize",
                egui::FontId::proportional(12.0),
                egui::Color32::LIGHT_GRAY,
            );
        }
    }
}

fn thumbnail_image(texture: &egui::TextureHandle) -> egui::Image<'static> {
    egui::Image::new((texture.id(), texture.size_vec2()))
        .max_size(egui::vec2(48.0, 48.0))
        .maintain_aspect_ratio(true)
}

fn paint_rect(
    painter: &egui::Painter,
    overlay: egui::Rect,
    editor: &RectangleEditor,
    rect: &CropRect,
    active: bool,
    with_handles: bool,
) {
    let view = editor
        .mapper()
        .to_view_space(rect, overlay.min)
        .translate(overlay.min.to_vec2());
    let color = if active {
        egui::Color32::from_rgb(255, 196, 0)
    } else {
        egui::Color32::from_rgb(0, 200, 255)
    };

    painter.rect_filled(view, 0.0, color.gamma_multiply(0.12));
    painter.rect_stroke(view, 0.0, egui::Stroke::new(1.5, color));
    if let Some(label) = describe_rect(rect) {
        painter.text(
            view.left_top() + egui::vec2(4.0, 4.0),
            egui::Align2::LEFT_TOP,
            label,
            egui::FontId::monospace(11.0),
            egui::Color32::WHITE,
        );
    }

    if with_handles {
        let handle_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);
        for handle in Handle::ALL {
            painter.circle(
                handle.position(view),
                HANDLE_RADIUS,
                egui::Color32::WHITE,
                handle_stroke,
            );
        }
    }
}

impl eframe::App for CropperApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.write_back_settings(frame);
        self.thumbs_loaded = 0;
        self.poll_save(ctx);
        self.handle_keyboard(ctx);

        let busy = self.pending_save.is_some();
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.add_enabled(!busy, egui::Button::new("Load folder")).clicked() {
                    self.load_folder(ctx);
                }
                if ui.add_enabled(!busy, egui::Button::new("Output folder")).clicked() {
                    self.choose_output();
                }
                if ui.button("Clear selections").clicked() {
                    self.editor.reset_selections();
                }
                ui.separator();
                if ui.add_enabled(!busy, egui::Button::new("Skip")).clicked() {
                    self.skip(ctx);
                }
                if ui.add_enabled(!busy, egui::Button::new("Accept")).clicked() {
                    self.accept(ctx);
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let show = |dir: &Option<PathBuf>| {
                    dir.as_ref()
                        .map(|d| d.display().to_string())
                        .unwrap_or_else(|| "—".to_string())
                };
                ui.label(format!("Input: {}", show(&self.input_dir)));
                ui.separator();
                ui.label(format!("Output: {}", show(&self.output_dir)));
                ui.separator();
                let natural = self.editor.image_size();
                if !natural.is_empty() {
                    ui.label(format!(
                        "Resolution: {} × {}",
                        natural.width as u32, natural.height as u32
                    ));
                    ui.separator();
                }
                ui.label(self.status.text());
            });
        });

        egui::SidePanel::left("library")
            .default_width(220.0)
            .show(ctx, |ui| self.library_ui(ui, ctx));

        egui::SidePanel::right("side")
            .default_width(240.0)
            .show(ctx, |ui| {
                self.settings_ui(ui);
                ui.separator();
                self.crops_ui(ui, ctx);
            });

        egui::CentralPanel::default().show(ctx, |ui| self.canvas_ui(ui, ctx));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        settings::save_settings(storage, &self.persisted);
    }
}
