use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, U256};
use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::core::{parse_command, Action, Command, NavigateTarget, NotifyLevel};
use crate::domain::metadata::TokenMetadata;
use crate::domain::party::{memberships, Connection, PartyView, ReadFailure};
use crate::domain::units::format_units;
use crate::infrastructure::runtime::{RuntimeCommand, RuntimeEvent};
use crate::sync::{
    AggregationInputs, Confirmation, Subscription, Ticket, TxError, TxOrchestrator, TxPhase,
    WriteOp,
};

/// Main tabs in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Join,
    Memberships,
    Admin,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Join, Tab::Memberships, Tab::Admin];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Join => "Join",
            Tab::Memberships => "My Memberships",
            Tab::Admin => "Admin",
        }
    }

    pub fn shortcut(&self) -> char {
        match self {
            Tab::Join => '1',
            Tab::Memberships => '2',
            Tab::Admin => '3',
        }
    }
}

impl From<NavigateTarget> for Tab {
    fn from(target: NavigateTarget) -> Self {
        match target {
            NavigateTarget::Join => Tab::Join,
            NavigateTarget::Memberships => Tab::Memberships,
            NavigateTarget::Admin => Tab::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Command,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Fee,
}

/// Admin "create party" form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateForm {
    pub name: String,
    pub fee: String,
    pub field: FormField,
}

impl Default for CreateForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            fee: String::new(),
            field: FormField::Name,
        }
    }
}

impl CreateForm {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn active_mut(&mut self) -> &mut String {
        match self.field {
            FormField::Name => &mut self.name,
            FormField::Fee => &mut self.fee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

impl From<NotifyLevel> for StatusLevel {
    fn from(level: NotifyLevel) -> Self {
        match level {
            NotifyLevel::Info => StatusLevel::Info,
            NotifyLevel::Warn => StatusLevel::Warn,
            NotifyLevel::Error => StatusLevel::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub since: Instant,
}

/// Modal message; blocks input until dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Membership NFT metadata, cached per token id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NftState {
    Loading,
    Ready(TokenMetadata),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct CommandBar {
    pub input: String,
    pub last: Option<String>,
}

const STATUS_TTL: Duration = Duration::from_secs(6);

#[derive(Debug)]
pub struct App {
    pub network: NetworkConfig,
    pub current_tab: Tab,
    pub input_mode: InputMode,
    /// Reconciled records from the last committed aggregation run
    pub views: Vec<PartyView>,
    pub read_failures: Vec<ReadFailure>,
    pub selected: usize,
    pub party_count: Option<u64>,
    pub owner: Option<Address>,
    /// Signer the worker reported, whether or not it is connected
    pub account: Option<Address>,
    pub connection: Connection,
    pub online: bool,
    pub endpoint: String,
    pub invalidation: u64,
    pub loading: bool,
    pub form: CreateForm,
    pub command: CommandBar,
    pub nft: BTreeMap<U256, NftState>,
    pub status: Option<StatusMessage>,
    pub notification: Option<Notification>,
    pub last_tx_url: Option<String>,
    pub help_open: bool,
    pub should_quit: bool,
    subscription: Subscription,
    orchestrator: TxOrchestrator,
    user_disconnected: bool,
    /// Ticket of the pending create submitted from the form
    form_ticket: Option<Ticket>,
    outbox: Vec<RuntimeCommand>,
}

impl App {
    pub fn new(network: NetworkConfig) -> Self {
        Self {
            endpoint: network.rpc_url.to_string(),
            network,
            current_tab: Tab::Join,
            input_mode: InputMode::Normal,
            views: Vec::new(),
            read_failures: Vec::new(),
            selected: 0,
            party_count: None,
            owner: None,
            account: None,
            connection: Connection::Disconnected,
            online: false,
            invalidation: 0,
            loading: false,
            form: CreateForm::default(),
            command: CommandBar::default(),
            nft: BTreeMap::new(),
            status: None,
            notification: None,
            last_tx_url: None,
            help_open: false,
            should_quit: false,
            subscription: Subscription::new(),
            orchestrator: TxOrchestrator::new(),
            user_disconnected: false,
            form_ticket: None,
            outbox: Vec::new(),
        }
    }

    /// Commands queued for the worker since the last call
    pub fn take_commands(&mut self) -> Vec<RuntimeCommand> {
        std::mem::take(&mut self.outbox)
    }

    /// Feed the aggregation inputs to the subscription and queue a run if they changed.
    pub fn sync(&mut self) {
        let inputs = AggregationInputs {
            party_count: self.party_count,
            connection: self.connection,
            invalidation: self.invalidation,
        };
        if let Some(trigger) = self.subscription.observe(inputs) {
            debug!(epoch = trigger.epoch, party_count = trigger.party_count, "aggregation triggered");
            self.loading = true;
            self.outbox.push(RuntimeCommand::Aggregate {
                epoch: trigger.epoch,
                party_count: trigger.party_count,
                connection: trigger.connection,
            });
        } else if !self.connection.is_connected() {
            self.loading = false;
        }
    }

    pub fn is_owner(&self) -> bool {
        self.connection.is_owner(self.owner)
    }

    pub fn is_busy(&self) -> bool {
        self.orchestrator.is_busy()
    }

    pub fn tx_phase(&self) -> &TxPhase {
        self.orchestrator.phase()
    }

    pub fn set_status(&mut self, text: impl Into<String>, level: StatusLevel) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level,
            since: Instant::now(),
        });
    }

    pub fn status_text(&self) -> Option<(&str, StatusLevel)> {
        self.status
            .as_ref()
            .map(|status| (status.text.as_str(), status.level))
    }

    fn notify(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.notification = Some(Notification {
            title: title.into(),
            body: body.into(),
        });
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    pub fn on_tick(&mut self) {
        if let Some(status) = self.status.as_ref() {
            if status.since.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }

    /// Fee with the native currency symbol, e.g. `0.01 TEA`
    pub fn fee_label(&self, wei: U256) -> String {
        format!(
            "{} {}",
            format_units(wei, self.network.currency_decimals),
            self.network.currency_symbol
        )
    }

    // ---- runtime events ----

    pub fn apply_event(&mut self, event: RuntimeEvent) {
        match event {
            RuntimeEvent::Connected {
                endpoint,
                chain_id,
                account,
            } => {
                info!(chain_id, %endpoint, "network reachable");
                self.online = true;
                self.endpoint = endpoint;
                self.account = account;
                if !self.user_disconnected && !self.connection.is_connected() {
                    self.connect();
                }
            }
            RuntimeEvent::ChainState { party_count, owner } => {
                if party_count.is_some() {
                    self.party_count = party_count;
                }
                if owner.is_some() {
                    self.owner = owner;
                }
                if self.current_tab == Tab::Admin && !self.is_owner() {
                    self.current_tab = Tab::Join;
                }
            }
            RuntimeEvent::AggregationReady {
                epoch,
                party_count,
                aggregation,
            } => {
                if !self.subscription.accepts(epoch) || !self.connection.is_connected() {
                    debug!(epoch, latest = self.subscription.epoch(), "dropping stale aggregation");
                    return;
                }
                self.views = aggregation.views;
                self.read_failures = aggregation.failures;
                self.party_count = Some(party_count);
                self.subscription.absorb_count(party_count);
                self.loading = false;
                self.clamp_selection();
                self.request_member_metadata();
            }
            RuntimeEvent::TxSubmitted { ticket, hash } => {
                if self.orchestrator.on_submitted(ticket, hash) {
                    let url = self.network.tx_url(&format!("{hash:#x}"));
                    self.set_status(format!("Submitted, awaiting confirmation: {url}"), StatusLevel::Info);
                    self.last_tx_url = Some(url);
                }
            }
            RuntimeEvent::TxSubmitFailed { ticket, error } => {
                if self.orchestrator.on_submit_failed(ticket, &error) {
                    self.notify("Transaction failed", error);
                }
            }
            RuntimeEvent::TxConfirmed {
                ticket,
                hash,
                success,
            } => match self.orchestrator.on_confirmed(ticket, hash, success) {
                Some(Confirmation::Applied) => {
                    self.invalidation += 1;
                    if self.form_ticket.take() == Some(ticket) {
                        self.form.clear();
                    }
                    self.set_status("Transaction confirmed", StatusLevel::Info);
                }
                Some(Confirmation::Reverted) => {
                    self.notify(
                        "Transaction reverted",
                        format!("{} was mined but reverted", self.network.tx_url(&format!("{hash:#x}"))),
                    );
                }
                None => {}
            },
            RuntimeEvent::TxTimedOut { ticket, hash } => {
                if self.orchestrator.on_confirmation_timeout(ticket, hash) {
                    self.set_status(
                        format!("No receipt for {hash:#x} yet; press r to refresh"),
                        StatusLevel::Warn,
                    );
                }
            }
            RuntimeEvent::MetadataReady { token_id, result } => {
                let state = match result {
                    Ok(metadata) => NftState::Ready(metadata),
                    Err(message) => NftState::Failed(message),
                };
                self.nft.insert(token_id, state);
            }
            RuntimeEvent::Error { message } => {
                self.set_status(message, StatusLevel::Error);
            }
        }
    }

    fn request_member_metadata(&mut self) {
        let tokens: Vec<U256> = self
            .views
            .iter()
            .filter(|view| view.is_member)
            .filter_map(|view| view.token_id)
            .filter(|id| !self.nft.contains_key(id))
            .collect();
        for token_id in tokens {
            self.nft.insert(token_id, NftState::Loading);
            self.outbox.push(RuntimeCommand::FetchMetadata { token_id });
        }
    }

    // ---- wallet ----

    pub fn connect(&mut self) {
        if !self.online {
            self.set_status(format!("{} is not reachable yet", self.network.name), StatusLevel::Warn);
            return;
        }
        let connection = match self.account {
            Some(address) => Connection::Wallet(address),
            None => Connection::ReadOnly,
        };
        if self.connection == connection {
            return;
        }
        self.user_disconnected = false;
        self.connection = connection;
        self.views.clear();
        self.read_failures.clear();
        self.selected = 0;
        match connection {
            Connection::Wallet(address) => {
                self.set_status(format!("Wallet connected: {address}"), StatusLevel::Info)
            }
            _ => self.set_status("Connected read-only (no signer)", StatusLevel::Warn),
        }
        self.sync();
    }

    pub fn disconnect(&mut self) {
        self.user_disconnected = true;
        self.connection = Connection::Disconnected;
        self.views.clear();
        self.read_failures.clear();
        self.selected = 0;
        self.loading = false;
        if self.current_tab == Tab::Admin {
            self.current_tab = Tab::Join;
        }
        self.set_status("Wallet disconnected", StatusLevel::Info);
        // Retire the in-flight epoch before any queued result is applied
        self.sync();
    }

    // ---- navigation ----

    pub fn set_tab(&mut self, tab: Tab) {
        if tab == Tab::Admin && !self.is_owner() {
            self.set_status(
                "Admin is only available to the contract owner",
                StatusLevel::Warn,
            );
            return;
        }
        self.current_tab = tab;
        self.selected = 0;
    }

    pub fn cycle_tab(&mut self, forward: bool) {
        let tabs: Vec<Tab> = Tab::ALL
            .into_iter()
            .filter(|tab| *tab != Tab::Admin || self.is_owner())
            .collect();
        let current = tabs.iter().position(|tab| *tab == self.current_tab).unwrap_or(0);
        let next = if forward {
            (current + 1) % tabs.len()
        } else {
            (current + tabs.len() - 1) % tabs.len()
        };
        self.set_tab(tabs[next]);
    }

    /// Records listed on the current tab
    pub fn visible_parties(&self) -> Vec<&PartyView> {
        match self.current_tab {
            Tab::Memberships => memberships(&self.views),
            Tab::Join | Tab::Admin => self.views.iter().collect(),
        }
    }

    pub fn selected_party(&self) -> Option<&PartyView> {
        self.visible_parties().get(self.selected).copied()
    }

    pub fn move_selection_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_selection_down(&mut self) {
        let len = self.visible_parties().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_parties().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    // ---- transactions ----

    pub fn join_selected(&mut self) {
        match self.selected_party().map(|party| party.id) {
            Some(id) => self.join_party(id),
            None => self.set_status("No party selected", StatusLevel::Warn),
        }
    }

    pub fn join_party(&mut self, id: u64) {
        if self.guard_busy() {
            return;
        }
        let Some(party) = self.views.iter().find(|view| view.id == id) else {
            self.set_status(format!("Party #{id} is not loaded"), StatusLevel::Error);
            return;
        };
        match self.orchestrator.prepare_join(party, self.connection) {
            Ok(op) => {
                self.submit(op);
            }
            Err(err) => self.reject(err),
        }
    }

    pub fn withdraw_selected(&mut self) {
        match self.selected_party().map(|party| party.id) {
            Some(id) => self.withdraw(id),
            None => self.set_status("No party selected", StatusLevel::Warn),
        }
    }

    pub fn withdraw(&mut self, id: u64) {
        if !self.is_owner() {
            self.set_status("Only the contract owner can withdraw", StatusLevel::Error);
            return;
        }
        if self.guard_busy() {
            return;
        }
        let Some(party) = self.views.iter().find(|view| view.id == id) else {
            self.set_status(format!("Party #{id} is not loaded"), StatusLevel::Error);
            return;
        };
        match self.orchestrator.prepare_withdraw(party, self.connection) {
            Ok(op) => {
                self.submit(op);
            }
            Err(err) => self.reject(err),
        }
    }

    /// Submit the create form. Empty fields are rejected before anything else.
    pub fn create_party(&mut self) {
        let (name, fee) = (self.form.name.clone(), self.form.fee.clone());
        if let Some(ticket) = self.create_party_with(&name, &fee) {
            self.form_ticket = Some(ticket);
        }
    }

    /// Submit a create from explicit arguments, leaving the form untouched
    pub fn create_party_with(&mut self, name: &str, fee: &str) -> Option<Ticket> {
        let op = match self.orchestrator.prepare_create(name, fee, self.connection) {
            Ok(op) => op,
            Err(err) => {
                self.reject(err);
                return None;
            }
        };
        if !self.is_owner() {
            self.set_status("Only the contract owner can create parties", StatusLevel::Error);
            return None;
        }
        if self.guard_busy() {
            return None;
        }
        Some(self.submit(op))
    }

    fn submit(&mut self, op: WriteOp) -> Ticket {
        let ticket = self.orchestrator.begin(&op);
        self.form_ticket = None;
        self.set_status(format!("Submitting {}…", op.label()), StatusLevel::Info);
        self.outbox.push(RuntimeCommand::Submit { ticket, op });
        ticket
    }

    fn reject(&mut self, err: TxError) {
        self.notify("Cannot submit", err.to_string());
    }

    fn guard_busy(&mut self) -> bool {
        if self.orchestrator.is_busy() {
            self.set_status("A transaction is already in progress", StatusLevel::Warn);
            return true;
        }
        false
    }

    /// Force a fresh aggregation run and chain-state poll
    pub fn refresh(&mut self) {
        self.invalidation += 1;
        self.nft.retain(|_, state| !matches!(state, NftState::Failed(_)));
        self.outbox.push(RuntimeCommand::RefreshChainState);
        self.set_status("Refreshing…", StatusLevel::Info);
        self.sync();
    }

    // ---- create form ----

    pub fn enter_form(&mut self) {
        if self.current_tab != Tab::Admin {
            return;
        }
        self.input_mode = InputMode::Form;
    }

    pub fn exit_form(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn toggle_form_field(&mut self) {
        self.form.field = match self.form.field {
            FormField::Name => FormField::Fee,
            FormField::Fee => FormField::Name,
        };
    }

    pub fn form_push(&mut self, ch: char) {
        self.form.active_mut().push(ch);
    }

    pub fn form_backspace(&mut self) {
        self.form.active_mut().pop();
    }

    pub fn submit_form(&mut self) {
        self.create_party();
        if self.notification.is_none() {
            self.exit_form();
        }
    }

    // ---- command bar ----

    pub fn enter_command(&mut self) {
        self.input_mode = InputMode::Command;
        self.command.input.clear();
    }

    pub fn exit_command(&mut self) {
        self.input_mode = InputMode::Normal;
        self.command.input.clear();
    }

    pub fn apply_command(&mut self) {
        let input = self.command.input.trim().to_string();
        if input.is_empty() {
            self.exit_command();
            return;
        }
        let cmd = parse_command(&input);
        let action = self.execute_command(&cmd);
        self.apply_action(action);
        self.command.last = Some(input);
        self.exit_command();
    }

    /// Execute a parsed command
    pub fn execute_command(&mut self, cmd: &Command) -> Action {
        match cmd {
            Command::Tab(name) => match NavigateTarget::parse(name) {
                Some(target) => Action::Navigate(target),
                None => Action::Notify(format!("Unknown tab: {name}"), NotifyLevel::Warn),
            },
            Command::Join(Some(id)) => {
                self.join_party(*id);
                Action::None
            }
            Command::Join(None) => {
                self.join_selected();
                Action::None
            }
            Command::Withdraw(Some(id)) => {
                self.withdraw(*id);
                Action::None
            }
            Command::Withdraw(None) => {
                self.withdraw_selected();
                Action::None
            }
            Command::Create { name, fee } => {
                self.create_party_with(name, fee);
                Action::None
            }
            Command::Refresh => {
                self.refresh();
                Action::None
            }
            Command::Connect => {
                self.connect();
                Action::None
            }
            Command::Disconnect => {
                self.disconnect();
                Action::None
            }
            Command::Quit => Action::Quit,
            Command::Unknown(s) => Action::Notify(format!("Unknown command: {s}"), NotifyLevel::Warn),
        }
    }

    /// Apply an action returned by a command
    pub fn apply_action(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Navigate(target) => self.set_tab(target.into()),
            Action::Notify(msg, level) => self.set_status(msg, level.into()),
            Action::Quit => self.should_quit = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::Aggregation;
    use alloy::primitives::{address, B256};

    const WALLET: Address = address!("00000000000000000000000000000000000000aa");
    const OTHER: Address = address!("00000000000000000000000000000000000000bb");

    fn view(id: u64, is_member: bool, token: Option<u64>, contributions: u64) -> PartyView {
        PartyView {
            id,
            name: format!("party-{id}"),
            join_fee: U256::from(10u64),
            member_count: 1,
            total_contributions: U256::from(contributions),
            is_member,
            token_id: token.map(U256::from),
        }
    }

    fn aggregate_commands(commands: &[RuntimeCommand]) -> Vec<(u64, u64)> {
        commands
            .iter()
            .filter_map(|cmd| match cmd {
                RuntimeCommand::Aggregate {
                    epoch, party_count, ..
                } => Some((*epoch, *party_count)),
                _ => None,
            })
            .collect()
    }

    /// Connected as `owner`'s peer with two parties committed
    fn connected_app(owner: Address) -> App {
        let mut app = App::new(NetworkConfig::tea_sepolia());
        app.apply_event(RuntimeEvent::Connected {
            endpoint: "mock".to_string(),
            chain_id: 10218,
            account: Some(WALLET),
        });
        app.apply_event(RuntimeEvent::ChainState {
            party_count: Some(2),
            owner: Some(owner),
        });
        app.sync();
        let runs = aggregate_commands(&app.take_commands());
        assert_eq!(runs.len(), 1);
        app.apply_event(RuntimeEvent::AggregationReady {
            epoch: runs[0].0,
            party_count: 2,
            aggregation: Aggregation {
                views: vec![view(0, false, None, 0), view(1, true, Some(7), 20)],
                failures: Vec::new(),
            },
        });
        app.sync();
        app
    }

    #[test]
    fn test_connect_triggers_single_run() {
        let mut app = connected_app(OTHER);
        assert_eq!(app.connection, Connection::Wallet(WALLET));
        assert_eq!(app.views.len(), 2);
        assert!(!app.loading);
        // Only the metadata fetch for the member token remains
        assert_eq!(
            app.take_commands(),
            vec![RuntimeCommand::FetchMetadata {
                token_id: U256::from(7)
            }]
        );
        assert_eq!(app.nft.get(&U256::from(7)), Some(&NftState::Loading));
    }

    #[test]
    fn test_empty_create_issues_nothing() {
        let mut app = connected_app(WALLET);
        app.take_commands();
        app.form.name = "Tea".to_string();
        app.create_party();

        assert!(app.take_commands().is_empty());
        assert!(!app.is_busy());
        assert_eq!(
            app.notification.as_ref().map(|n| n.body.as_str()),
            Some("Please enter both name and fee")
        );
    }

    #[test]
    fn test_confirmation_invalidates_once() {
        let mut app = connected_app(WALLET);
        app.take_commands();
        app.form.name = "Matcha".to_string();
        app.form.fee = "0.01".to_string();
        app.create_party();
        assert!(app.is_busy());

        let commands = app.take_commands();
        let ticket = match commands.as_slice() {
            [RuntimeCommand::Submit { ticket, op }] => {
                assert_eq!(
                    op,
                    &WriteOp::CreateParty {
                        name: "Matcha".to_string(),
                        join_fee: U256::from(10_000_000_000_000_000u64)
                    }
                );
                *ticket
            }
            other => panic!("unexpected {other:?}"),
        };

        let hash = B256::with_last_byte(1);
        app.apply_event(RuntimeEvent::TxSubmitted { ticket, hash });
        assert!(app.tx_phase() != &TxPhase::Idle);
        assert!(app.last_tx_url.as_deref().unwrap().contains("/tx/0x"));

        let before = app.invalidation;
        app.apply_event(RuntimeEvent::TxConfirmed {
            ticket,
            hash,
            success: true,
        });
        // A duplicate event for the same ticket is ignored
        app.apply_event(RuntimeEvent::TxConfirmed {
            ticket,
            hash,
            success: true,
        });
        assert_eq!(app.invalidation, before + 1);
        assert!(!app.is_busy());
        assert_eq!(app.form, CreateForm::default());

        app.sync();
        let runs = aggregate_commands(&app.take_commands());
        assert_eq!(runs.len(), 1);

        // Committing the run with the grown count does not start another
        app.apply_event(RuntimeEvent::AggregationReady {
            epoch: runs[0].0,
            party_count: 3,
            aggregation: Aggregation::default(),
        });
        app.sync();
        assert!(aggregate_commands(&app.take_commands()).is_empty());
        app.apply_event(RuntimeEvent::ChainState {
            party_count: Some(3),
            owner: Some(WALLET),
        });
        app.sync();
        assert!(aggregate_commands(&app.take_commands()).is_empty());
    }

    #[test]
    fn test_submit_failure_lowers_busy_without_invalidation() {
        let mut app = connected_app(OTHER);
        app.take_commands();
        app.join_party(0);
        let ticket = match app.take_commands().as_slice() {
            [RuntimeCommand::Submit { ticket, .. }] => *ticket,
            other => panic!("unexpected {other:?}"),
        };

        let before = app.invalidation;
        app.apply_event(RuntimeEvent::TxSubmitFailed {
            ticket,
            error: "user rejected the request".to_string(),
        });
        assert!(!app.is_busy());
        assert_eq!(app.invalidation, before);
        assert_eq!(
            app.notification.as_ref().map(|n| n.title.as_str()),
            Some("Transaction failed")
        );
    }

    #[test]
    fn test_busy_blocks_second_submission() {
        let mut app = connected_app(WALLET);
        app.take_commands();
        app.join_party(0);
        app.withdraw(1);
        let commands = app.take_commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(app.status_text().map(|s| s.1), Some(StatusLevel::Warn));
    }

    #[test]
    fn test_stale_aggregation_is_dropped() {
        let mut app = connected_app(OTHER);
        app.take_commands();
        app.refresh();
        app.sync();
        let first = aggregate_commands(&app.take_commands());
        app.refresh();
        app.sync();
        let second = aggregate_commands(&app.take_commands());

        app.apply_event(RuntimeEvent::AggregationReady {
            epoch: second[0].0,
            party_count: 1,
            aggregation: Aggregation {
                views: vec![view(0, false, None, 0)],
                failures: Vec::new(),
            },
        });
        app.apply_event(RuntimeEvent::AggregationReady {
            epoch: first[0].0,
            party_count: 2,
            aggregation: Aggregation {
                views: vec![view(0, false, None, 0), view(1, false, None, 0)],
                failures: Vec::new(),
            },
        });
        assert_eq!(app.views.len(), 1);
    }

    #[test]
    fn test_admin_tab_requires_owner() {
        let mut app = connected_app(OTHER);
        app.set_tab(Tab::Admin);
        assert_eq!(app.current_tab, Tab::Join);

        let mut owner = connected_app(WALLET);
        owner.set_tab(Tab::Admin);
        assert_eq!(owner.current_tab, Tab::Admin);
        owner.cycle_tab(true);
        assert_eq!(owner.current_tab, Tab::Join);
    }

    #[test]
    fn test_memberships_tab_filters() {
        let mut app = connected_app(OTHER);
        app.set_tab(Tab::Memberships);
        let visible: Vec<u64> = app.visible_parties().iter().map(|p| p.id).collect();
        assert_eq!(visible, vec![1]);
        assert_eq!(app.selected_party().and_then(|p| p.token_id), Some(U256::from(7)));
    }

    #[test]
    fn test_disconnect_clears_views_and_skips_runs() {
        let mut app = connected_app(WALLET);
        app.set_tab(Tab::Admin);
        app.take_commands();
        app.disconnect();
        app.sync();
        assert!(app.views.is_empty());
        assert_eq!(app.current_tab, Tab::Join);
        assert!(aggregate_commands(&app.take_commands()).is_empty());

        // A worker reconnect does not override the user's choice
        app.apply_event(RuntimeEvent::Connected {
            endpoint: "mock".to_string(),
            chain_id: 10218,
            account: Some(WALLET),
        });
        assert_eq!(app.connection, Connection::Disconnected);

        app.execute_command(&Command::Connect);
        app.sync();
        assert_eq!(aggregate_commands(&app.take_commands()).len(), 1);
    }

    #[test]
    fn test_disconnect_retires_in_flight_run() {
        let mut app = connected_app(WALLET);
        app.take_commands();
        app.refresh();
        let runs = aggregate_commands(&app.take_commands());
        assert_eq!(runs.len(), 1);

        // The result lands in the same frame as the disconnect, before sync
        app.disconnect();
        app.apply_event(RuntimeEvent::AggregationReady {
            epoch: runs[0].0,
            party_count: 2,
            aggregation: Aggregation {
                views: vec![view(0, true, Some(1), 0)],
                failures: Vec::new(),
            },
        });
        app.sync();

        assert_eq!(app.connection, Connection::Disconnected);
        assert!(app.views.is_empty());
        assert!(!app.loading);
        assert!(app.take_commands().is_empty());
    }

    #[test]
    fn test_refresh_supersedes_before_sync() {
        let mut app = connected_app(OTHER);
        app.take_commands();
        app.refresh();
        let first = aggregate_commands(&app.take_commands());
        app.refresh();

        app.apply_event(RuntimeEvent::AggregationReady {
            epoch: first[0].0,
            party_count: 1,
            aggregation: Aggregation {
                views: vec![view(0, false, None, 0)],
                failures: Vec::new(),
            },
        });
        assert_eq!(app.views.len(), 2);
        assert!(app.loading);
    }

    #[test]
    fn test_create_command_leaves_form_untouched() {
        let mut app = connected_app(WALLET);
        app.take_commands();
        app.form.name = "Draft".to_string();
        app.form.fee = "0.5".to_string();

        app.execute_command(&Command::Create {
            name: "Oolong".to_string(),
            fee: "0.02".to_string(),
        });
        let ticket = match app.take_commands().as_slice() {
            [RuntimeCommand::Submit { ticket, op }] => {
                assert_eq!(
                    op,
                    &WriteOp::CreateParty {
                        name: "Oolong".to_string(),
                        join_fee: U256::from(20_000_000_000_000_000u64)
                    }
                );
                *ticket
            }
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(app.form.name, "Draft");

        let hash = B256::with_last_byte(2);
        app.apply_event(RuntimeEvent::TxSubmitted { ticket, hash });
        app.apply_event(RuntimeEvent::TxConfirmed {
            ticket,
            hash,
            success: true,
        });
        assert_eq!(app.form.name, "Draft");
        assert_eq!(app.form.fee, "0.5");
    }

    #[test]
    fn test_metadata_result_cached() {
        let mut app = connected_app(OTHER);
        app.take_commands();
        app.apply_event(RuntimeEvent::MetadataReady {
            token_id: U256::from(7),
            result: Ok(TokenMetadata {
                image: Some("ipfs://x".to_string()),
                ..TokenMetadata::default()
            }),
        });
        app.refresh();
        app.sync();
        let runs = aggregate_commands(&app.take_commands());
        app.apply_event(RuntimeEvent::AggregationReady {
            epoch: runs[0].0,
            party_count: 2,
            aggregation: Aggregation {
                views: vec![view(0, false, None, 0), view(1, true, Some(7), 20)],
                failures: Vec::new(),
            },
        });
        let commands = app.take_commands();
        assert!(!commands
            .iter()
            .any(|cmd| matches!(cmd, RuntimeCommand::FetchMetadata { .. })));
        assert!(matches!(app.nft.get(&U256::from(7)), Some(NftState::Ready(_))));
    }

    #[test]
    fn test_command_bar_routes_actions() {
        let mut app = connected_app(OTHER);
        app.take_commands();
        app.enter_command();
        app.command.input = "tab my".to_string();
        app.apply_command();
        assert_eq!(app.current_tab, Tab::Memberships);
        assert_eq!(app.input_mode, InputMode::Normal);

        app.enter_command();
        app.command.input = "q".to_string();
        app.apply_command();
        assert!(app.should_quit);
    }

    #[test]
    fn test_fee_label() {
        let app = App::new(NetworkConfig::tea_sepolia());
        assert_eq!(
            app.fee_label(U256::from(10_000_000_000_000_000u64)),
            "0.01 TEA"
        );

        let six = App::new(NetworkConfig {
            currency_symbol: "USDX",
            currency_decimals: 6,
            ..NetworkConfig::tea_sepolia()
        });
        assert_eq!(six.fee_label(U256::from(2_500_000u64)), "2.5 USDX");
    }
}
