use std::{
    io, thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{canvas::Canvas, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use salvage_core::{
    entity::{ComponentKind, Condition, Entity, FieldUpdate, GroupColor, PilotPatch, Position, Stat},
    session::{ChassisChoice, SelectionKind, SessionEvent, Tab},
    Catalog, EntityId, MechBuild, SlotKind, Tracker,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const MOVE_STEP: f32 = 10.0;
const MAX_NAME_LEN: usize = 48;
const TAB_TITLES: [&str; 3] = ["Combat Tracker", "Mech Builder", "Combat Map"];
const STATS: [Stat; 4] = [Stat::Sp, Stat::Ep, Stat::Heat, Stat::Hp];

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

fn group_color(color: GroupColor) -> Color {
    match color {
        GroupColor::White => Color::White,
        GroupColor::Red => Color::Red,
        GroupColor::Blue => Color::Blue,
        GroupColor::Green => Color::Green,
        GroupColor::Yellow => Color::Yellow,
    }
}

fn stat_label(stat: Stat) -> &'static str {
    match stat {
        Stat::Sp => "SP",
        Stat::Ep => "EP",
        Stat::Heat => "Heat",
        Stat::Hp => "HP",
    }
}

fn tab_index(tab: Tab) -> usize {
    match tab {
        Tab::CombatTracker => 0,
        Tab::MechBuilder => 1,
        Tab::CombatMap => 2,
    }
}

fn next_tab(tab: Tab) -> Tab {
    match tab {
        Tab::CombatTracker => Tab::MechBuilder,
        Tab::MechBuilder => Tab::CombatMap,
        Tab::CombatMap => Tab::CombatTracker,
    }
}

/// Step of the add-entity picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddStage {
    Kind,
    Chassis,
    Pattern,
    Category,
    Template,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickerPurpose {
    AddEntity(AddStage),
    Attach(SlotKind),
}

#[derive(Debug, Clone)]
struct Picker {
    purpose: PickerPurpose,
    options: Vec<String>,
    cursor: usize,
}

impl Picker {
    fn move_cursor(&mut self, delta: isize) {
        if self.options.is_empty() {
            self.cursor = 0;
            return;
        }
        let max = self.options.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, max) as usize;
    }

    fn selected(&self) -> Option<&str> {
        self.options.get(self.cursor).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptTarget {
    Entity(EntityId),
    Build,
}

#[derive(Debug, Clone)]
struct NamePrompt {
    target: PromptTarget,
    value: String,
}

enum AppEvent {
    Input(Event),
    Tick,
}

struct UiState {
    cursor: usize,
    component_cursor: usize,
    stat: Stat,
    status: String,
    should_quit: bool,
    build: MechBuild,
    build_slot: SlotKind,
    build_cursor: usize,
    pattern_cursor: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            cursor: 0,
            component_cursor: 0,
            stat: Stat::Sp,
            status: "Ready".to_string(),
            should_quit: false,
            build: MechBuild::default(),
            build_slot: SlotKind::System,
            build_cursor: 0,
            pattern_cursor: 0,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }
}

/// Terminal front end over a [`Tracker`].
pub struct TrackerApp {
    tracker: Tracker,
    state: UiState,
    picker: Option<Picker>,
    prompt: Option<NamePrompt>,
    theme: Theme,
}

impl TrackerApp {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            state: UiState::default(),
            picker: None,
            prompt: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let entities = self.tracker.state().entities().len();
        self.state
            .set_status(format!("Loaded {entities} entities. Press ? for keys."));

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            match event_rx.recv().await {
                Some(AppEvent::Input(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    self.handle_key(key)
                }
                Some(AppEvent::Input(_)) => {}
                Some(AppEvent::Tick) => self.handle_tick(),
                None => break,
            }
        }

        restore_terminal(&mut terminal)?;
        info!("Tracker closed");
        Ok(())
    }

    fn handle_tick(&mut self) {
        let selected = self.selected_id();
        if self.tracker.tick(Instant::now()) {
            if let Some(id) = selected {
                self.select_id(id);
            }
        }
    }

    fn selected_id(&self) -> Option<EntityId> {
        self.tracker
            .state()
            .entities()
            .get(self.state.cursor)
            .map(|entity| entity.id)
    }

    fn selected_entity(&self) -> Option<&Entity> {
        self.tracker.state().entities().get(self.state.cursor)
    }

    fn select_id(&mut self, id: EntityId) {
        if let Some(index) = self
            .tracker
            .state()
            .entities()
            .iter()
            .position(|entity| entity.id == id)
        {
            self.state.cursor = index;
        }
    }

    fn clamp_cursor(&mut self) {
        let len = self.tracker.state().entities().len();
        self.state.cursor = self.state.cursor.min(len.saturating_sub(1));
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.tracker.state().entities().len();
        if len == 0 {
            self.state.cursor = 0;
            return;
        }
        let max = len as isize - 1;
        self.state.cursor = (self.state.cursor as isize + delta).clamp(0, max) as usize;
        self.state.component_cursor = 0;
    }

    /// Send an event to the tracker; rejected events only surface in the status line.
    fn dispatch(&mut self, event: SessionEvent) -> bool {
        match self.tracker.dispatch(event) {
            Ok(_) => {
                self.clamp_cursor();
                true
            }
            Err(err) => {
                warn!("Event rejected: {err}");
                self.state.set_status(format!("Error: {err}"));
                false
            }
        }
    }

    fn dispatch_selected(&mut self, event: impl FnOnce(EntityId) -> SessionEvent) {
        match self.selected_id() {
            Some(id) => {
                self.dispatch(event(id));
            }
            None => self.state.set_status("No entity selected"),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }
        if self.picker.is_some() {
            self.handle_picker_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.should_quit = true
            }
            KeyCode::Tab => {
                let tab = next_tab(self.tracker.state().tab());
                self.dispatch(SessionEvent::SetTab(tab));
            }
            KeyCode::F(1) => {
                self.dispatch(SessionEvent::SetTab(Tab::CombatTracker));
            }
            KeyCode::F(2) => {
                self.dispatch(SessionEvent::SetTab(Tab::MechBuilder));
            }
            KeyCode::F(3) => {
                self.dispatch(SessionEvent::SetTab(Tab::CombatMap));
            }
            KeyCode::Char('?') => {
                let help = self.help_text();
                self.state.set_status(help);
            }
            _ => match self.tracker.state().tab() {
                Tab::CombatTracker => self.handle_tracker_key(key),
                Tab::MechBuilder => self.handle_builder_key(key),
                Tab::CombatMap => self.handle_map_key(key),
            },
        }
    }

    fn help_text(&self) -> &'static str {
        match self.tracker.state().tab() {
            Tab::CombatTracker => {
                "a add  space acted  d disabled  g color  D duplicate  x remove  s stat  +/- value  </> max  [/] component  r condition  X detach  i/o attach  p/P pilot  (/) pilot HP  n rename"
            }
            Tab::MechBuilder => {
                "c chassis  m systems/modules  enter add  x remove last  n rename  w save  l load  X delete pattern  C clear"
            }
            Tab::CombatMap => "j/k select  arrows move",
        }
    }

    fn handle_tracker_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Char('a') => self.open_add_picker(),
            KeyCode::Char(' ') => self.dispatch_selected(SessionEvent::ToggleActed),
            KeyCode::Char('d') => self.dispatch_selected(SessionEvent::ToggleDisabled),
            KeyCode::Char('g') => self.dispatch_selected(SessionEvent::CycleGroupColor),
            KeyCode::Char('D') => {
                if let Some(id) = self.selected_id() {
                    if self.dispatch(SessionEvent::DuplicateEntity(id)) {
                        let last = self.tracker.state().entities().len().saturating_sub(1);
                        self.state.cursor = last;
                    }
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                self.dispatch_selected(SessionEvent::RemoveEntity)
            }
            KeyCode::Char('s') => self.cycle_stat(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_current(1),
            KeyCode::Char('-') => self.adjust_current(-1),
            KeyCode::Char('>') => self.adjust_max(1),
            KeyCode::Char('<') => self.adjust_max(-1),
            KeyCode::Char(']') => self.move_component_cursor(1),
            KeyCode::Char('[') => self.move_component_cursor(-1),
            KeyCode::Char('r') => {
                if let Some((kind, index)) = self.selected_component() {
                    self.dispatch_selected(|id| SessionEvent::CycleCondition { id, kind, index });
                }
            }
            KeyCode::Char('X') => {
                if let Some((kind, index)) = self.selected_component() {
                    self.dispatch_selected(|id| SessionEvent::DetachComponent { id, kind, index });
                    self.state.component_cursor = self.state.component_cursor.saturating_sub(1);
                }
            }
            KeyCode::Char('i') => self.open_attach_picker(SlotKind::System),
            KeyCode::Char('o') => self.open_attach_picker(SlotKind::Module),
            KeyCode::Char('p') => self.dispatch_selected(SessionEvent::AddPilot),
            KeyCode::Char('P') => {
                let last = self
                    .selected_entity()
                    .and_then(|entity| entity.pilots.len().checked_sub(1));
                if let Some(index) = last {
                    self.dispatch_selected(|id| SessionEvent::RemovePilot { id, index });
                }
            }
            KeyCode::Char('(') => self.adjust_pilot_hp(-1),
            KeyCode::Char(')') => self.adjust_pilot_hp(1),
            KeyCode::Char('n') => {
                let prompt = self.selected_entity().map(|entity| NamePrompt {
                    target: PromptTarget::Entity(entity.id),
                    value: entity.name.clone(),
                });
                if prompt.is_some() {
                    self.prompt = prompt;
                }
            }
            _ => {}
        }
    }

    fn tracked_stats(&self) -> Vec<Stat> {
        self.selected_entity()
            .map(|entity| {
                STATS
                    .into_iter()
                    .filter(|stat| entity.gauge(*stat).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn focused_stat(&self) -> Option<Stat> {
        let stats = self.tracked_stats();
        if stats.contains(&self.state.stat) {
            Some(self.state.stat)
        } else {
            stats.first().copied()
        }
    }

    fn cycle_stat(&mut self) {
        let stats = self.tracked_stats();
        let Some(current) = self.focused_stat() else {
            return;
        };
        let index = stats.iter().position(|s| *s == current).unwrap_or(0);
        self.state.stat = stats[(index + 1) % stats.len()];
    }

    fn adjust_current(&mut self, delta: i64) {
        let Some(stat) = self.focused_stat() else {
            return;
        };
        let Some(current) = self
            .selected_entity()
            .and_then(|entity| entity.gauge(stat))
            .map(|gauge| i64::from(gauge.current()))
        else {
            return;
        };
        self.dispatch_selected(|id| SessionEvent::UpdateEntity {
            id,
            updates: vec![FieldUpdate::Current(stat, current + delta)],
        });
    }

    fn adjust_max(&mut self, delta: i64) {
        let Some(stat) = self.focused_stat() else {
            return;
        };
        let Some(max) = self
            .selected_entity()
            .and_then(|entity| entity.gauge(stat))
            .map(|gauge| i64::from(gauge.max()))
        else {
            return;
        };
        let max = u32::try_from((max + delta).max(0)).unwrap_or(0);
        self.dispatch_selected(|id| SessionEvent::UpdateEntity {
            id,
            updates: vec![FieldUpdate::Max(stat, max)],
        });
    }

    fn adjust_pilot_hp(&mut self, delta: i64) {
        let Some(hp) = self
            .selected_entity()
            .and_then(|entity| entity.pilots.first())
            .map(|pilot| i64::from(pilot.hp.current()))
        else {
            self.state.set_status("No pilot aboard");
            return;
        };
        let patch = PilotPatch {
            hp: Some(hp + delta),
            ..PilotPatch::default()
        };
        self.dispatch_selected(|id| SessionEvent::UpdatePilot {
            id,
            index: 0,
            patch,
        });
    }

    fn component_slots(entity: &Entity) -> Vec<(ComponentKind, usize)> {
        [
            ComponentKind::System,
            ComponentKind::Module,
            ComponentKind::Ability,
        ]
        .into_iter()
        .flat_map(|kind| (0..entity.components(kind).len()).map(move |index| (kind, index)))
        .collect()
    }

    fn selected_component(&self) -> Option<(ComponentKind, usize)> {
        let entity = self.selected_entity()?;
        Self::component_slots(entity)
            .get(self.state.component_cursor)
            .copied()
    }

    fn move_component_cursor(&mut self, delta: isize) {
        let len = self
            .selected_entity()
            .map(|entity| Self::component_slots(entity).len())
            .unwrap_or(0);
        if len == 0 {
            self.state.component_cursor = 0;
            return;
        }
        let max = len as isize - 1;
        self.state.component_cursor =
            (self.state.component_cursor as isize + delta).clamp(0, max) as usize;
    }

    fn open_add_picker(&mut self) {
        self.tracker.state_mut().selection_mut().reset();
        self.open_stage(AddStage::Kind);
    }

    fn open_stage(&mut self, stage: AddStage) {
        let options = self.stage_options(stage);
        self.picker = Some(Picker {
            purpose: PickerPurpose::AddEntity(stage),
            options,
            cursor: 0,
        });
    }

    fn stage_options(&self, stage: AddStage) -> Vec<String> {
        let catalog = self.tracker.catalog();
        let selection = self.tracker.state().selection();
        match stage {
            AddStage::Kind => vec!["Mech".to_string(), "Other".to_string()],
            AddStage::Chassis => catalog
                .chassis_names()
                .map(str::to_string)
                .chain(std::iter::once("Custom".to_string()))
                .collect(),
            AddStage::Pattern => match selection.chassis() {
                Some(ChassisChoice::Catalog(name)) => catalog
                    .chassis(name)
                    .map(|chassis| chassis.pattern_names().map(str::to_string).collect())
                    .unwrap_or_default(),
                Some(ChassisChoice::Custom) => std::iter::once("Blank mech".to_string())
                    .chain(
                        self.tracker
                            .state()
                            .patterns()
                            .iter()
                            .map(|pattern| pattern.name.clone()),
                    )
                    .collect(),
                None => Vec::new(),
            },
            AddStage::Category => catalog
                .categories()
                .iter()
                .map(|category| category.category.clone())
                .collect(),
            AddStage::Template => selection
                .category()
                .and_then(|name| catalog.category(name).ok())
                .map(|category| {
                    category
                        .entities
                        .iter()
                        .map(|template| template.name.clone())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    fn open_attach_picker(&mut self, slot: SlotKind) {
        if self.selected_entity().is_none() {
            self.state.set_status("No entity selected");
            return;
        }
        let options = self
            .tracker
            .catalog()
            .components(slot)
            .map(|component| component.name.clone())
            .collect();
        self.picker = Some(Picker {
            purpose: PickerPurpose::Attach(slot),
            options,
            cursor: 0,
        });
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let Some(picker) = self.picker.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.picker = None,
            KeyCode::Char('j') | KeyCode::Down => picker.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => picker.move_cursor(-1),
            KeyCode::Enter => {
                let purpose = picker.purpose;
                let cursor = picker.cursor;
                let Some(choice) = picker.selected().map(str::to_string) else {
                    self.picker = None;
                    return;
                };
                self.picker = None;
                match purpose {
                    PickerPurpose::AddEntity(stage) => self.advance_add(stage, cursor, choice),
                    PickerPurpose::Attach(slot) => {
                        if self.dispatch_attach(slot, &choice) {
                            self.state.set_status(format!("Attached {choice}"));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn dispatch_attach(&mut self, slot: SlotKind, name: &str) -> bool {
        match self.selected_id() {
            Some(id) => self.dispatch(SessionEvent::AttachComponent {
                id,
                slot,
                name: name.to_string(),
            }),
            None => false,
        }
    }

    fn advance_add(&mut self, stage: AddStage, cursor: usize, choice: String) {
        let next = {
            let patterns: Vec<_> = self
                .tracker
                .state()
                .patterns()
                .iter()
                .map(|pattern| pattern.id)
                .collect();
            let selection = self.tracker.state_mut().selection_mut();
            match stage {
                AddStage::Kind if choice == "Mech" => {
                    selection.select_kind(SelectionKind::Mech);
                    Some(AddStage::Chassis)
                }
                AddStage::Kind => {
                    selection.select_kind(SelectionKind::Other);
                    Some(AddStage::Category)
                }
                AddStage::Chassis if choice == "Custom" => {
                    selection.select_chassis(ChassisChoice::Custom);
                    Some(AddStage::Pattern)
                }
                AddStage::Chassis => {
                    selection.select_chassis(ChassisChoice::Catalog(choice));
                    Some(AddStage::Pattern)
                }
                AddStage::Pattern => {
                    if selection.chassis() == Some(&ChassisChoice::Custom) {
                        if let Some(id) = cursor.checked_sub(1).and_then(|i| patterns.get(i)) {
                            selection.select_custom_pattern(*id);
                        }
                    } else {
                        selection.select_pattern(choice);
                    }
                    None
                }
                AddStage::Category => {
                    selection.select_category(choice);
                    Some(AddStage::Template)
                }
                AddStage::Template => {
                    selection.select_template(choice);
                    None
                }
            }
        };
        match next {
            Some(stage) => self.open_stage(stage),
            None => self.add_selected(),
        }
    }

    fn add_selected(&mut self) {
        match self.tracker.add_selected() {
            Ok(Some(id)) => {
                self.select_id(id);
                let name = self
                    .selected_entity()
                    .map(|entity| entity.name.clone())
                    .unwrap_or_default();
                self.state.set_status(format!("Added {name}"));
            }
            Ok(None) => self.state.set_status("Selection incomplete"),
            Err(err) => {
                warn!("Add entity failed: {err}");
                self.state.set_status(format!("Error: {err}"));
            }
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                prompt.value.pop();
            }
            KeyCode::Char(ch) if prompt.value.chars().count() < MAX_NAME_LEN => {
                prompt.value.push(ch);
            }
            KeyCode::Enter => {
                let value = prompt.value.trim().to_string();
                let target = prompt.target;
                self.prompt = None;
                if value.is_empty() {
                    self.state.set_status("Name cannot be empty");
                    return;
                }
                match target {
                    PromptTarget::Entity(id) => {
                        self.dispatch(SessionEvent::UpdateEntity {
                            id,
                            updates: vec![FieldUpdate::Name(value)],
                        });
                    }
                    PromptTarget::Build => self.state.build.rename(value),
                }
            }
            _ => {}
        }
    }

    fn handle_builder_key(&mut self, key: KeyEvent) {
        let catalog = self.tracker.catalog();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                let len = catalog.components(self.state.build_slot).count();
                self.state.build_cursor = (self.state.build_cursor + 1).min(len.saturating_sub(1));
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.build_cursor = self.state.build_cursor.saturating_sub(1);
            }
            KeyCode::Char('m') => {
                self.state.build_slot = match self.state.build_slot {
                    SlotKind::System => SlotKind::Module,
                    SlotKind::Module => SlotKind::System,
                };
                self.state.build_cursor = 0;
            }
            KeyCode::Char('c') => {
                let names: Vec<&str> = catalog.chassis_names().collect();
                let next = self
                    .state
                    .build
                    .chassis()
                    .and_then(|current| names.iter().position(|name| *name == current))
                    .map(|index| (index + 1) % names.len())
                    .unwrap_or(0);
                if let Some(name) = names.get(next) {
                    if let Err(err) = self.state.build.select_chassis(catalog, name) {
                        self.state.set_status(format!("Error: {err}"));
                    }
                }
            }
            KeyCode::Enter => {
                let slot = self.state.build_slot;
                let Some(name) = catalog
                    .components(slot)
                    .nth(self.state.build_cursor)
                    .map(|component| component.name.clone())
                else {
                    return;
                };
                if self.state.build.chassis().is_none() {
                    self.state.set_status("Pick a chassis first (c)");
                    return;
                }
                let result = match slot {
                    SlotKind::System => self.state.build.add_system(catalog, &name),
                    SlotKind::Module => self.state.build.add_module(catalog, &name),
                };
                match result {
                    Ok(()) => self.state.set_status(format!("Installed {name}")),
                    Err(err) => self.state.set_status(format!("Error: {err}")),
                }
            }
            KeyCode::Char('x') => {
                let build = &mut self.state.build;
                let removed = match self.state.build_slot {
                    SlotKind::System => build
                        .systems()
                        .len()
                        .checked_sub(1)
                        .and_then(|i| build.remove_system(i)),
                    SlotKind::Module => build
                        .modules()
                        .len()
                        .checked_sub(1)
                        .and_then(|i| build.remove_module(i)),
                };
                if let Some(name) = removed {
                    self.state.set_status(format!("Removed {name}"));
                }
            }
            KeyCode::Char('n') => {
                self.prompt = Some(NamePrompt {
                    target: PromptTarget::Build,
                    value: self.state.build.name().to_string(),
                });
            }
            KeyCode::Char('w') => match self.state.build.to_draft() {
                Some(draft) => {
                    let name = draft.name.clone();
                    if self.dispatch(SessionEvent::SavePattern(draft)) {
                        self.state.set_status(format!("Saved pattern {name}"));
                    }
                }
                None => self.state.set_status("Pick a chassis first (c)"),
            },
            KeyCode::Char('l') => {
                let patterns = self.tracker.state().patterns();
                if patterns.is_empty() {
                    self.state.set_status("No saved patterns");
                    return;
                }
                let index = self.state.pattern_cursor % patterns.len();
                let pattern = &patterns[index];
                match self.state.build.load_pattern(catalog, pattern) {
                    Ok(()) => self.state.set_status(format!("Loaded pattern {}", pattern.name)),
                    Err(err) => self.state.set_status(format!("Error: {err}")),
                }
                self.state.pattern_cursor = index + 1;
            }
            KeyCode::Char('X') => {
                let name = self.state.build.name().to_string();
                if self.dispatch(SessionEvent::DeletePattern(name.clone())) {
                    self.state.set_status(format!("Deleted pattern {name}"));
                }
            }
            KeyCode::Char('C') => {
                self.state.build.clear();
                self.state.set_status("Builder cleared");
            }
            _ => {}
        }
    }

    fn handle_map_key(&mut self, key: KeyEvent) {
        let (dx, dy) = match key.code {
            KeyCode::Char('j') => return self.move_cursor(1),
            KeyCode::Char('k') => return self.move_cursor(-1),
            KeyCode::Left => (-MOVE_STEP, 0.0),
            KeyCode::Right => (MOVE_STEP, 0.0),
            KeyCode::Up => (0.0, -MOVE_STEP),
            KeyCode::Down => (0.0, MOVE_STEP),
            _ => return,
        };
        let bounds = self.tracker.bounds();
        let Some(current) = self.selected_entity().map(|entity| {
            entity.position.unwrap_or(Position {
                x: bounds.width / 2.0,
                y: bounds.height / 2.0,
            })
        }) else {
            return;
        };
        let position = Position {
            x: (current.x + dx).clamp(0.0, bounds.width),
            y: (current.y + dy).clamp(0.0, bounds.height),
        };
        self.dispatch_selected(|id| SessionEvent::MoveEntity { id, position });
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(area);

        let tabs = Tabs::new(TAB_TITLES.to_vec())
            .block(Block::default().borders(Borders::ALL).title("Salvage Tracker"))
            .select(tab_index(self.tracker.state().tab()))
            .highlight_style(
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, layout[0]);

        match self.tracker.state().tab() {
            Tab::CombatTracker => self.render_tracker(frame, layout[1]),
            Tab::MechBuilder => self.render_builder(frame, layout[1]),
            Tab::CombatMap => self.render_map(frame, layout[1]),
        }
        self.render_status(frame, layout[2]);

        if let Some(picker) = &self.picker {
            self.render_picker(frame, picker);
        }
        if let Some(prompt) = &self.prompt {
            self.render_prompt(frame, prompt);
        }
    }

    fn render_tracker(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);

        let entities = self.tracker.state().entities();
        let items: Vec<ListItem> = entities
            .iter()
            .map(|entity| {
                let mut name_style = Style::default().fg(group_color(entity.group_color));
                if entity.has_acted {
                    name_style = name_style.add_modifier(Modifier::DIM);
                }
                if entity.is_disabled {
                    name_style = name_style.add_modifier(Modifier::CROSSED_OUT);
                }
                let acted = if entity.has_acted { "✓ " } else { "  " };
                let summary = STATS
                    .into_iter()
                    .filter_map(|stat| {
                        entity
                            .gauge(stat)
                            .map(|g| format!("{} {}/{}", stat_label(stat), g.current(), g.max()))
                    })
                    .collect::<Vec<_>>()
                    .join("  ");
                ListItem::new(Line::from(vec![
                    Span::styled(acted, Style::default().fg(self.theme.success)),
                    Span::styled(entity.name.clone(), name_style),
                    Span::styled(format!("  {summary}"), Style::default().fg(self.theme.muted)),
                ]))
            })
            .collect();

        let pending = entities.iter().filter(|entity| !entity.has_acted).count();
        let title = format!("Entities ({pending}/{} to act)", entities.len());
        let mut list_state = ListState::default();
        if !entities.is_empty() {
            list_state.select(Some(self.state.cursor));
        }
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, columns[0], &mut list_state);

        self.render_details(frame, columns[1]);
    }

    fn render_details(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Details");
        let Some(entity) = self.selected_entity() else {
            let hint = Paragraph::new("No entities yet. Press a to add one.")
                .block(block)
                .style(Style::default().fg(self.theme.muted));
            frame.render_widget(hint, area);
            return;
        };

        let accent = Style::default()
            .fg(self.theme.accent)
            .add_modifier(Modifier::BOLD);
        let mut lines = vec![Line::from(Span::styled(entity.name.clone(), accent))];
        if let Some(chassis) = &entity.chassis {
            lines.push(Line::from(format!("Chassis: {chassis}")));
        }
        if let Some(category) = &entity.category {
            lines.push(Line::from(format!("Category: {category}")));
        }
        if let Some(description) = &entity.description {
            lines.push(Line::from(Span::styled(
                description.clone(),
                Style::default().fg(self.theme.muted),
            )));
        }

        let focused = self.focused_stat();
        let stats: Vec<Span> = STATS
            .into_iter()
            .filter_map(|stat| {
                let gauge = entity.gauge(stat)?;
                let text = format!("{} {}/{}  ", stat_label(stat), gauge.current(), gauge.max());
                let style = if Some(stat) == focused {
                    Style::default().bg(self.theme.selection_bg)
                } else {
                    Style::default()
                };
                Some(Span::styled(text, style))
            })
            .collect();
        lines.push(Line::from(stats));

        if entity.system_slots.is_some() || entity.module_slots.is_some() {
            let loadout = entity.loadout(self.tracker.catalog());
            lines.push(Line::from(format!(
                "Slots: systems {}/{}  modules {}/{}",
                loadout.used_system_slots,
                entity.system_slots.unwrap_or(0),
                loadout.used_module_slots,
                entity.module_slots.unwrap_or(0),
            )));
        }

        let selected = self.selected_component();
        for (kind, title) in [
            (ComponentKind::System, "Systems"),
            (ComponentKind::Module, "Modules"),
            (ComponentKind::Ability, "Abilities"),
        ] {
            let components = entity.components(kind);
            if components.is_empty() {
                continue;
            }
            lines.push(Line::from(Span::styled(title, accent)));
            for (index, component) in components.iter().enumerate() {
                let color = match component.condition {
                    Condition::Normal => self.theme.primary_fg,
                    Condition::Damaged => self.theme.warning,
                    Condition::Destroyed => self.theme.danger,
                };
                let marker = if selected == Some((kind, index)) { "▶ " } else { "  " };
                lines.push(Line::from(vec![
                    Span::raw(marker),
                    Span::styled(
                        format!("{} ({:?})", component.name, component.condition),
                        Style::default().fg(color),
                    ),
                ]));
            }
        }

        if let Some((kind, index)) = selected {
            if let Some(component) = entity.components(kind).get(index) {
                let muted = Style::default().fg(self.theme.muted);
                let details = component_details(self.tracker.catalog(), entity, kind, &component.name);
                lines.extend(details.into_iter().map(|text| Line::from(Span::styled(text, muted))));
            }
        }

        if !entity.pilots.is_empty() {
            lines.push(Line::from(Span::styled("Pilots", accent)));
            for pilot in &entity.pilots {
                lines.push(Line::from(format!(
                    "  {}  HP {}/{}  AP {}/{}",
                    pilot.name,
                    pilot.hp.current(),
                    pilot.hp.max(),
                    pilot.ap.current(),
                    pilot.ap.max()
                )));
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_builder(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);
        let catalog = self.tracker.catalog();
        let slot = self.state.build_slot;

        let items: Vec<ListItem> = catalog
            .components(slot)
            .map(|component| {
                ListItem::new(format!(
                    "{}  TL{}  slots {}  salvage {}",
                    component.name,
                    component.tech_level(),
                    component.slots_required(),
                    component.salvage_value()
                ))
            })
            .collect();
        let title = match slot {
            SlotKind::System => "Catalog systems",
            SlotKind::Module => "Catalog modules",
        };
        let mut list_state = ListState::default();
        list_state.select(Some(self.state.build_cursor));
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, columns[0], &mut list_state);

        let build = &self.state.build;
        let stats = build.stats();
        let loadout = build.loadout(catalog);
        let accent = Style::default()
            .fg(self.theme.accent)
            .add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from(Span::styled(build.name().to_string(), accent)),
            Line::from(format!("Chassis: {}", build.chassis().unwrap_or("none"))),
            Line::from(format!(
                "SP {}  EP {}  Heat {}",
                stats.max_sp, stats.max_ep, stats.max_heat
            )),
            Line::from(format!(
                "Slots: systems {}/{}  modules {}/{}",
                loadout.used_system_slots,
                stats.system_slots,
                loadout.used_module_slots,
                stats.module_slots
            )),
        ];
        let salvage: Vec<String> = (1..=salvage_core::loadout::MAX_TECH_LEVEL)
            .filter(|tl| loadout.salvage_at(*tl) > 0)
            .map(|tl| format!("TL{tl}: {}", loadout.salvage_at(tl)))
            .collect();
        if !salvage.is_empty() {
            lines.push(Line::from(format!("Salvage  {}", salvage.join("  "))));
        }
        lines.push(Line::from(Span::styled("Systems", accent)));
        lines.extend(build.systems().iter().map(|name| Line::from(format!("  {name}"))));
        lines.push(Line::from(Span::styled("Modules", accent)));
        lines.extend(build.modules().iter().map(|name| Line::from(format!("  {name}"))));

        let saved = self.tracker.state().patterns().len();
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Build ({saved} saved patterns)")),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, columns[1]);
    }

    fn render_map(&self, frame: &mut Frame, area: Rect) {
        let bounds = self.tracker.bounds();
        let width = f64::from(bounds.width);
        let height = f64::from(bounds.height);
        let selected = self.selected_id();
        let tokens: Vec<(f64, f64, String, Style)> = self
            .tracker
            .state()
            .entities()
            .iter()
            .filter_map(|entity| {
                let position = entity.position?;
                let mut style = Style::default().fg(group_color(entity.group_color));
                if Some(entity.id) == selected {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                let label: String = entity.name.chars().take(12).collect();
                Some((
                    f64::from(position.x),
                    height - f64::from(position.y),
                    label,
                    style,
                ))
            })
            .collect();

        let canvas = Canvas::default()
            .block(Block::default().borders(Borders::ALL).title("Combat Map"))
            .x_bounds([0.0, width])
            .y_bounds([0.0, height])
            .paint(move |ctx| {
                for (x, y, label, style) in &tokens {
                    ctx.print(*x, *y, Span::styled(label.clone(), *style));
                }
            });
        frame.render_widget(canvas, area);
    }

    fn render_picker(&self, frame: &mut Frame, picker: &Picker) {
        let area = centered_rect(50, 60, frame.size());
        let title = match picker.purpose {
            PickerPurpose::AddEntity(AddStage::Kind) => "Add entity",
            PickerPurpose::AddEntity(AddStage::Chassis) => "Chassis",
            PickerPurpose::AddEntity(AddStage::Pattern) => "Pattern",
            PickerPurpose::AddEntity(AddStage::Category) => "Category",
            PickerPurpose::AddEntity(AddStage::Template) => "Template",
            PickerPurpose::Attach(SlotKind::System) => "Attach system",
            PickerPurpose::Attach(SlotKind::Module) => "Attach module",
        };
        let items: Vec<ListItem> = picker
            .options
            .iter()
            .map(|option| ListItem::new(option.clone()))
            .collect();
        let mut list_state = ListState::default();
        if !picker.options.is_empty() {
            list_state.select(Some(picker.cursor));
        }
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .bg(self.theme.accent)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(Clear, area);
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_prompt(&self, frame: &mut Frame, prompt: &NamePrompt) {
        let area = centered_rect(50, 20, frame.size());
        let paragraph = Paragraph::new(vec![
            Line::from(format!("{}_", prompt.value)),
            Line::from(Span::styled(
                "Enter to confirm, Esc to cancel",
                Style::default().fg(self.theme.muted),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title("Name"));
        frame.render_widget(Clear, area);
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let sort = if self.tracker.sort_pending() {
            "  (sorting soon)"
        } else {
            ""
        };
        let paragraph = Paragraph::new(Line::from(vec![
            Span::raw(self.state.status.clone()),
            Span::styled(sort, Style::default().fg(self.theme.muted)),
        ]))
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

/// Catalog text for one attached component: description, range, damage and
/// traits. Abilities are looked up through the entity's category.
fn component_details(catalog: &Catalog, entity: &Entity, kind: ComponentKind, name: &str) -> Vec<String> {
    let mut facts = Vec::new();
    let (description, range, damage, traits) = match kind {
        ComponentKind::Ability => {
            let Some(ability) = entity
                .category
                .as_deref()
                .and_then(|category| catalog.ability(category, name))
            else {
                return Vec::new();
            };
            (&ability.description, &ability.range, &ability.damage, &ability.traits)
        }
        ComponentKind::System | ComponentKind::Module => {
            let slot = if kind == ComponentKind::System {
                SlotKind::System
            } else {
                SlotKind::Module
            };
            let Ok(component) = catalog.component(slot, name) else {
                return Vec::new();
            };
            facts.push(format!("TL {}", component.tech_level()));
            facts.push(format!("Slots {}", component.slots_required()));
            let data = &component.data;
            (&data.description, &data.range, &data.damage, &data.traits)
        }
    };
    if let Some(range) = range {
        facts.push(format!("Range {range}"));
    }
    if let Some(damage) = damage {
        facts.push(format!("Damage {damage}"));
    }

    let mut lines = Vec::new();
    if let Some(description) = description {
        lines.push(format!("  {description}"));
    }
    if !facts.is_empty() {
        lines.push(format!("  {}", facts.join("  ")));
    }
    if !traits.is_empty() {
        lines.push(format!("  Traits: {}", traits.join(", ")));
    }
    lines
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use salvage_core::{
        entity::{EntityRequest, MapBounds},
        EntityFactory, IdGenerator,
    };

    use super::*;

    #[test]
    fn ability_details_come_from_the_catalog() -> Result<()> {
        let catalog = Catalog::bundled()?;
        let mut ids = IdGenerator::default();
        let mut titan = EntityFactory::new(&catalog, &[], MapBounds::default()).create(
            &EntityRequest::Other {
                category: "Bio-Titans".to_string(),
                template: "Rust Leviathan".to_string(),
            },
            &mut ids,
        )?;
        titan.name = "Big One".to_string();

        let lines = component_details(&catalog, &titan, ComponentKind::Ability, "Acid Spray");
        assert_eq!(
            lines,
            vec![
                "  Corrodes everything in a cone.".to_string(),
                "  Range Medium  Damage 4SP".to_string(),
                "  Traits: Blast".to_string(),
            ]
        );
        assert!(component_details(&catalog, &titan, ComponentKind::System, "Nope").is_empty());
        Ok(())
    }
}
