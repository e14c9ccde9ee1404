// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine l'interface TUI en utilisant les widgets de ratatui :
// header, barre de recherche, liste des tickers, footer.
//
// Le rendu est entièrement piloté par le ViewState du contrôleur :
// - Loading  : indicateur de chargement
// - Showing  : liste des tickers filtrés
// - Degraded : liste du cache + bandeau hors-ligne
// - Failed   : message d'erreur centré
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::App;
use crate::controller::ViewState;
use crate::models::Ticker;

/// Dessine l'interface complète
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size());

    render_header(frame, chunks[0]);
    render_search_bar(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_footer(frame, app, chunks[3]);
}

/// Crée le layout principal (header, recherche, contenu, footer)
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Barre de recherche
            Constraint::Min(0),    // Contenu : tout le reste
            Constraint::Length(3), // Footer
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Header
// ============================================================================

/// Dessine le header avec le titre
fn render_header(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" LazyTicker ")
        .title_alignment(Alignment::Center);

    let text = vec![Line::from(Span::styled(
        "Suivi des marchés crypto Bitfinex",
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    ))];

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Barre de recherche
// ============================================================================

/// Dessine la barre de recherche
///
/// Bordure verte quand elle a le focus, cyan sinon. Le curseur n'est
/// affiché qu'en mode recherche.
fn render_search_bar(frame: &mut Frame, app: &App, area: Rect) {
    let border_color = if app.is_searching() {
        Color::Green
    } else {
        Color::Cyan
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Recherche ");

    let mut spans = vec![
        Span::styled(
            "Filtre : ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.query.as_str(), Style::default().fg(Color::White)),
    ];

    if app.is_searching() {
        // Curseur
        spans.push(Span::styled(
            "█",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::SLOW_BLINK),
        ));
    } else if app.query.is_empty() {
        spans.push(Span::styled(
            "(appuyez sur / pour filtrer)",
            Style::default().fg(Color::Gray),
        ));
    }

    let paragraph = Paragraph::new(vec![Line::from(spans)]).block(block);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Main Content
// ============================================================================

/// Dessine le contenu principal selon l'état du contrôleur
fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match &app.view {
        ViewState::Loading => {
            render_message(frame, area, "Chargement des tickers...", Color::Gray);
        }

        ViewState::Showing(tickers) => {
            render_ticker_list(frame, app, tickers, area);
        }

        ViewState::Degraded { tickers, reason } => {
            // Liste du cache en haut, bandeau hors-ligne en bas
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(3)])
                .split(area);

            render_ticker_list(frame, app, tickers, chunks[0]);
            render_offline_banner(frame, reason, chunks[1]);
        }

        ViewState::Failed(reason) => {
            render_message(frame, area, reason, Color::Red);
        }
    }
}

/// Dessine la liste des tickers
fn render_ticker_list(frame: &mut Frame, app: &App, tickers: &[Ticker], area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Tickers ");

    if tickers.is_empty() {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Aucun ticker ne correspond au filtre",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = tickers
        .iter()
        .enumerate()
        .map(|(index, ticker)| {
            let style = if ticker.is_positive() {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };

            let arrow = if ticker.is_positive() { "▲" } else { "▼" };
            let line = format!(
                " {:<8} {:>14}  {} {:>8}",
                ticker.display_symbol(),
                ticker.formatted_price(),
                arrow,
                ticker.formatted_daily_change(),
            );

            let mut list_item = ListItem::new(line).style(style);
            if index == app.selected_index {
                list_item = list_item.style(
                    style
                        .add_modifier(Modifier::BOLD)
                        .add_modifier(Modifier::REVERSED),
                );
            }

            list_item
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}

/// Dessine le bandeau hors-ligne sous la liste (mode dégradé)
fn render_offline_banner(frame: &mut Frame, reason: &str, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let text = vec![Line::from(Span::styled(
        format!("⚠  {} — données en cache  ⚠", reason),
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ))];

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

/// Dessine un message centré (chargement, erreur)
fn render_message(frame: &mut Frame, area: Rect, message: &str, color: Color) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Tickers ");

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(color))),
    ];

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Footer
// ============================================================================

/// Dessine le footer avec les raccourcis clavier
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let shortcuts = if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled(
                "⚠  Appuyez sur ",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "[q]",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
            Span::styled(
                " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ])
    } else if app.is_searching() {
        Line::from(vec![
            Span::styled(
                "[Enter]",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Valider  "),
            Span::styled(
                "[ESC]",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Effacer"),
        ])
    } else {
        Line::from(vec![
            Span::styled(
                "[q]",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Quit  "),
            Span::styled(
                "[/]",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Filtrer  "),
            Span::styled(
                "[r]",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Rafraîchir  "),
            Span::styled(
                "[↑↓ / j k]",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Naviguer  "),
            Span::styled(
                "[ESC]",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Effacer le filtre"),
        ])
    };

    let paragraph = Paragraph::new(vec![shortcuts])
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}
