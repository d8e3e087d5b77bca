use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ticket::TicketView;

/// Errors produced while turning a ticket into a document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render failed: {0}")]
    Failed(String),

    #[error("Missing data for report: {0}")]
    MissingData(String),
}

/// Turns a joined ticket view into artifact bytes.
///
/// Implementations must not have side effects; storing the bytes is the
/// artifact store's job.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Name of this renderer for logging and audit.
    fn name(&self) -> &str;

    /// Extension of the artifacts this renderer produces, without the dot.
    fn file_extension(&self) -> &str;

    async fn render(&self, view: &TicketView) -> Result<Vec<u8>, RenderError>;
}

const NOT_AVAILABLE: &str = "N/A";

/// Plain-text Customer Service Report (RAC).
///
/// Times are printed in UTC.
#[derive(Debug, Clone, Default)]
pub struct TextReportRenderer;

impl TextReportRenderer {
    pub fn new() -> Self {
        Self
    }

    fn document(view: &TicketView) -> String {
        let ticket = &view.ticket;
        let mut doc = String::new();

        doc.push_str("RELATÓRIO DE ATENDIMENTO AO CLIENTE\n");
        doc.push_str(&format!("Chamado: {}\n\n", ticket.id));

        section(&mut doc, "DADOS DO ATENDIMENTO");
        line(&mut doc, "Data", &format_date(&ticket.created_at));
        line(&mut doc, "Hora início", &format_time(Some(&ticket.created_at)));
        line(&mut doc, "Hora fim", &format_time(ticket.closed_at.as_ref()));
        line(&mut doc, "Tempo de atendimento", &format_minutes(ticket.service_minutes));
        line(&mut doc, "Prioridade", ticket.priority.label());
        line(&mut doc, "Status", ticket.status.label());
        line(&mut doc, "Categoria", &view.category);
        line(&mut doc, "Plantonista", &view.handler.name);

        section(&mut doc, "CLIENTE");
        line(&mut doc, "Nome", &view.client.name);
        line(&mut doc, "CNPJ/CPF", &view.client.document);
        line(&mut doc, "Contato", &view.client.contact);
        line(&mut doc, "Telefone", &view.client.phone);
        line(&mut doc, "E-mail", &view.client.email);
        line(&mut doc, "Solicitante", &ticket.requester);

        if let Some(project) = &view.project {
            section(&mut doc, "PROJETO");
            line(&mut doc, "Sigla", &project.code);
            line(&mut doc, "Nome", &project.name);
            line(&mut doc, "Gerente", &project.manager);
            line(&mut doc, "E-mail do gerente", &project.manager_email);
            line(&mut doc, "Telefone do gerente", &project.manager_phone);
        }

        section(&mut doc, "DESCRIÇÃO");
        line(&mut doc, "Motivo", &ticket.motive);
        line(&mut doc, "Ambiente", &ticket.environment);
        line(&mut doc, "Tempo de ocorrência", &format_minutes(ticket.occurrence_minutes));

        block(&mut doc, "ANÁLISE", &ticket.analysis);
        block(&mut doc, "PROCEDIMENTOS", &ticket.procedures);
        block(&mut doc, "SOLUÇÃO", &ticket.solution);
        block(&mut doc, "OBSERVAÇÕES", &ticket.observations);
        block(&mut doc, "RECOMENDAÇÕES", &ticket.recommendations);

        doc
    }
}

#[async_trait]
impl Renderer for TextReportRenderer {
    fn name(&self) -> &str {
        "text"
    }

    fn file_extension(&self) -> &str {
        "txt"
    }

    async fn render(&self, view: &TicketView) -> Result<Vec<u8>, RenderError> {
        if view.ticket.id.is_empty() {
            return Err(RenderError::MissingData("ticket identifier".to_string()));
        }
        Ok(Self::document(view).into_bytes())
    }
}

fn section(doc: &mut String, title: &str) {
    doc.push_str(&format!("\n== {} ==\n", title));
}

fn line(doc: &mut String, label: &str, value: &str) {
    doc.push_str(&format!("{}: {}\n", label, or_na(value)));
}

fn block(doc: &mut String, title: &str, text: &str) {
    section(doc, title);
    doc.push_str(or_na(text));
    doc.push('\n');
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%d/%m/%Y").to_string()
}

fn format_time(at: Option<&DateTime<Utc>>) -> String {
    at.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `Xh Ymin`, or N/A when unknown.
fn format_minutes(minutes: Option<u32>) -> String {
    match minutes {
        Some(m) => format!("{}h {}min", m / 60, m % 60),
        None => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use chrono::TimeZone;

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(Some(135)), "2h 15min");
        assert_eq!(format_minutes(Some(0)), "0h 0min");
        assert_eq!(format_minutes(None), "N/A");
    }

    #[test]
    fn test_format_date_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(format_date(&at), "07/03/2024");
        assert_eq!(format_time(Some(&at)), "09:05");
        assert_eq!(format_time(None), "N/A");
    }

    #[tokio::test]
    async fn test_render_document() {
        let mut view = fixtures::ticket_view("RAC0042");
        view.ticket.created_at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap();
        view.ticket.closed_at = Some(Utc.with_ymd_and_hms(2024, 3, 7, 10, 40, 0).unwrap());
        view.ticket.service_minutes = Some(95);
        view.ticket.observations = String::new();

        let bytes = TextReportRenderer::new().render(&view).await.unwrap();
        let doc = String::from_utf8(bytes).unwrap();

        assert!(doc.starts_with("RELATÓRIO DE ATENDIMENTO AO CLIENTE\nChamado: RAC0042\n"));
        assert!(doc.contains("Data: 07/03/2024\n"));
        assert!(doc.contains("Hora início: 09:05\n"));
        assert!(doc.contains("Hora fim: 10:40\n"));
        assert!(doc.contains("Tempo de atendimento: 1h 35min\n"));
        assert!(doc.contains("Nome: ACME Ltda\n"));
        assert!(doc.contains("== OBSERVAÇÕES ==\nN/A\n"));
    }

    #[tokio::test]
    async fn test_render_without_project_omits_section() {
        let mut view = fixtures::ticket_view("RAC0001");
        view.project = None;

        let bytes = TextReportRenderer::new().render(&view).await.unwrap();
        let doc = String::from_utf8(bytes).unwrap();
        assert!(!doc.contains("== PROJETO =="));
    }
}
