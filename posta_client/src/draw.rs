use super::*;

const INFO_COLOR: Color32 = Color32::from_rgb(166, 209, 137);
const MUTED_COLOR: Color32 = Color32::from_rgb(130, 139, 184);

const ACCENT: Color32 = Color32::from_rgb(236, 178, 92); // stamp orange

/// Dark theme with one accent colour; everything else stays egui's default.
pub fn configure_styles(ctx: &egui::Context) {
    ctx.set_visuals(egui::Visuals::dark());
    ctx.style_mut(|style| {
        let visuals = &mut style.visuals;
        visuals.panel_fill = Color32::from_rgb(30, 30, 36);
        visuals.hyperlink_color = ACCENT;
        visuals.selection.bg_fill = ACCENT.linear_multiply(0.4);
        visuals.selection.stroke = Stroke::new(1.0, ACCENT);
        visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT);
        for widget in [
            &mut visuals.widgets.inactive,
            &mut visuals.widgets.hovered,
            &mut visuals.widgets.active,
        ] {
            widget.rounding = Rounding::same(4.0);
        }
        style.spacing.button_padding = Vec2::new(10.0, 6.0);
    });
}

fn card() -> Frame {
    Frame::none()
        .inner_margin(Margin::same(12.0))
        .rounding(Rounding::same(6.0))
}

impl PostaApp {
    pub fn draw_auth_view(&mut self, ctx: &egui::Context) {
        let registering = self.view.route == Route::Register;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.with_layout(Layout::top_down(Align::Center), |ui| {
                ui.add_space(ui.available_height() * 0.2);
                ui.heading(if registering { "Create account" } else { "Sign in to Posta" });
                ui.add_space(20.0);
                card()
                    .fill(ui.style().visuals.widgets.noninteractive.bg_fill)
                    .show(ui, |ui| {
                        ui.set_width(300.0);
                        ui.vertical_centered_justified(|ui| {
                            ui.label("Username");
                            ui.text_edit_singleline(&mut self.view.login.username);
                            ui.add_space(10.0);
                            ui.label("Password");
                            let password = ui.add(
                                egui::TextEdit::singleline(&mut self.view.login.password).password(true),
                            );
                            ui.add_space(20.0);

                            let submit_text = if registering { "Create" } else { "Login" };
                            let enter = password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                            let submit = ui
                                .add_enabled(!self.view.busy(), egui::Button::new(submit_text))
                                .clicked();
                            if submit || (enter && !self.view.busy()) {
                                let username = self.view.login.username.clone();
                                let password = self.view.login.password.clone();
                                let action = if registering {
                                    ToBackend::Register(username, password)
                                } else {
                                    ToBackend::Login(username, password)
                                };
                                self.send(action);
                            }

                            ui.add_space(10.0);
                            let switch_text = if registering {
                                "Back to login"
                            } else {
                                "No account? Create one"
                            };
                            if ui.link(switch_text).clicked() {
                                self.view.navigate(if registering { Route::Login } else { Route::Register });
                            }
                        });
                    });
                self.draw_status_line(ui);
            });
        });
    }

    pub fn draw_inbox_view(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("inbox_header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.heading("📬 Inbox");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui
                        .button("Delete account")
                        .on_hover_text("Removes your account and all its messages")
                        .clicked()
                    {
                        self.send(ToBackend::DeleteAccount);
                    }
                    if ui.button("🚪 Logout").clicked() {
                        self.send(ToBackend::Logout);
                    }
                    if ui.button("⟳ Refresh").clicked() {
                        self.send(ToBackend::RefreshInbox);
                    }
                });
            });
            self.draw_status_line(ui);
        });

        egui::SidePanel::left("compose_panel")
            .min_width(260.0)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.add_space(10.0);
                ui.heading("New message");
                ui.add_space(10.0);
                ui.label("To");
                ui.text_edit_singleline(&mut self.view.draft.to);
                ui.label("Subject");
                ui.text_edit_singleline(&mut self.view.draft.subject);
                ui.label("Body");
                ui.add(egui::TextEdit::multiline(&mut self.view.draft.body).desired_rows(8));
                ui.add_space(10.0);
                if ui.button("✉ Send").clicked() {
                    self.send(ToBackend::SendMessage(self.view.draft.clone()));
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.view.inbox.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label(egui::RichText::new("No messages.").color(MUTED_COLOR));
                });
                return;
            }

            let mut toggled: Option<String> = None;
            let mut deleted: Option<String> = None;
            egui::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
                for entry in self.view.inbox.iter() {
                    let message = &entry.item;
                    // Keyed by server id so egui state follows the message, not its row.
                    ui.push_id(&message.id, |ui| {
                        card()
                            .fill(ui.style().visuals.widgets.noninteractive.bg_fill)
                            .show(ui, |ui| {
                                ui.set_width(ui.available_width());
                                ui.horizontal(|ui| {
                                    ui.label(
                                        egui::RichText::new(format!("({}) Subject: {}", message.from, message.subject))
                                            .strong(),
                                    );
                                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                        if ui.button("Delete").clicked() {
                                            deleted = Some(message.id.clone());
                                        }
                                        let toggle_text = if entry.ui.body_visible { "Hide" } else { "View" };
                                        if ui.button(toggle_text).clicked() {
                                            toggled = Some(message.id.clone());
                                        }
                                    });
                                });
                                if entry.ui.body_visible {
                                    ui.add_space(4.0);
                                    ui.label(&message.body);
                                }
                            });
                    });
                    ui.add_space(6.0);
                }
            });

            if let Some(id) = toggled {
                self.view.inbox.toggle_body(&id);
            }
            if let Some(id) = deleted {
                self.send(ToBackend::DeleteMessage(id));
            }
        });
    }

    pub fn draw_admin_view(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("admin_header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.heading("Users");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("🚪 Logout").clicked() {
                        self.send(ToBackend::Logout);
                    }
                    if ui.button("⟳ Refresh").clicked() {
                        self.send(ToBackend::RefreshUsers);
                    }
                });
            });
            self.draw_status_line(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let mut deleted: Option<String> = None;
            egui::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
                for entry in self.view.users.iter() {
                    let username = &entry.item.username;
                    ui.push_id(username, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(username);
                            if ui.button("Delete User").clicked() {
                                deleted = Some(username.clone());
                            }
                        });
                    });
                    ui.separator();
                }
            });
            if let Some(username) = deleted {
                self.send(ToBackend::DeleteUser(username));
            }
        });
    }

    pub fn draw_status_line(&self, ui: &mut egui::Ui) {
        ui.add_space(6.0);
        if let Some(text) = self.view.status.text() {
            ui.label(egui::RichText::new(text).color(INFO_COLOR));
        }
        if self.view.busy() {
            ui.spinner();
        }
    }
}
