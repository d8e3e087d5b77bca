//! Reply texts sent back to the chat.

use super::session::{IntakeDraft, IntakeStep};
use crate::ticket::Ticket;

/// Configured command tokens, as shown to the sender.
#[derive(Debug, Clone, Copy)]
pub struct Tokens<'a> {
    pub trigger: &'a str,
    pub affirmative: &'a str,
    pub negative: &'a str,
    pub search: &'a str,
}

pub fn prompt(step: IntakeStep) -> &'static str {
    match step {
        IntakeStep::AwaitingClient => "Por favor, informe o nome do cliente:",
        IntakeStep::AwaitingRequester => "Informe o nome do solicitante:",
        IntakeStep::AwaitingProject => "Informe a sigla do projeto (ex: SUP, DEV, INFRA):",
        IntakeStep::AwaitingMotive => "Descreva o motivo da solicitação:",
        IntakeStep::AwaitingPriority => "Qual a prioridade? (Baixa, Média, Alta, Crítica):",
        IntakeStep::AwaitingDiagnosis => "Informe o diagnóstico e solução aplicada:",
        IntakeStep::AwaitingConfirmation => "Os dados estão corretos?",
    }
}

pub fn summary(draft: &IntakeDraft, tokens: &Tokens<'_>) -> String {
    format!(
        "*Resumo do Chamado:*\n\n\
         *Cliente:* {}\n\
         *Solicitante:* {}\n\
         *Projeto:* {}\n\
         *Motivo:* {}\n\
         *Prioridade:* {}\n\
         *Diagnóstico/Solução:* {}\n\n\
         Os dados estão corretos? Responda '{}' para confirmar ou '{}' para corrigir.",
        draft.client,
        draft.requester,
        draft.project,
        draft.motive,
        draft.priority().label(),
        draft.diagnosis,
        tokens.affirmative,
        tokens.negative,
    )
}

pub fn confirm_again(tokens: &Tokens<'_>) -> String {
    format!(
        "Por favor, responda '{}' para confirmar ou '{}' para corrigir.",
        tokens.affirmative, tokens.negative
    )
}

pub fn restarted() -> String {
    format!("Vamos recomeçar. {}", prompt(IntakeStep::AwaitingClient))
}

pub fn registered(ticket_id: &str) -> String {
    format!(
        "Chamado registrado com sucesso! ID: {}\n\
         O relatório será gerado e enviado automaticamente.",
        ticket_id
    )
}

pub fn registration_failed(tokens: &Tokens<'_>) -> String {
    format!(
        "Não foi possível registrar o chamado agora. Responda '{}' para tentar novamente.",
        tokens.affirmative
    )
}

pub fn cancelled() -> &'static str {
    "Chamado cancelado. Nenhum dado foi registrado."
}

pub fn help(tokens: &Tokens<'_>) -> String {
    format!(
        "Para iniciar um novo chamado, envie '{}'.\n\
         Para consultar o histórico, envie '{} [termo de busca]'.",
        capitalize(tokens.trigger),
        capitalize(tokens.search)
    )
}

pub fn search_results(term: &str, tickets: &[Ticket]) -> String {
    if tickets.is_empty() {
        return format!("Nenhum chamado encontrado para \"{}\".", term);
    }

    let mut reply = format!("*Chamados encontrados para \"{}\":*", term);
    for ticket in tickets {
        reply.push_str(&format!(
            "\n{} ({}) - {}",
            ticket.id,
            ticket.status.label(),
            ticket.motive
        ));
    }
    reply
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
