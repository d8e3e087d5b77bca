//! Test fixtures and helper functions.

use chrono::Utc;

use crate::identifier::IdentifierAllocator;
use crate::ticket::{
    Client, Handler, NewTicket, Priority, Project, Ticket, TicketRepository, TicketStatus,
    TicketView,
};

/// Allocator with the default `RAC` prefix and four digits.
pub fn allocator() -> IdentifierAllocator {
    IdentifierAllocator::new("RAC", 4)
}

/// A resolved ticket for `client`, filed under project SUP.
pub fn new_ticket(client: &str) -> NewTicket {
    NewTicket {
        client_name: client.to_string(),
        requester: "Maria Souza".to_string(),
        handler_name: "plantonista".to_string(),
        category_name: "Suporte Técnico".to_string(),
        project_code: Some("SUP".to_string()),
        priority: Priority::High,
        status: Some(TicketStatus::Resolved),
        motive: "Servidor de arquivos fora do ar".to_string(),
        environment: "Produção".to_string(),
        analysis: "Disco cheio no volume de dados".to_string(),
        procedures: "Limpeza de logs antigos".to_string(),
        solution: "Espaço liberado e serviço reiniciado".to_string(),
        observations: String::new(),
        recommendations: "Monitorar uso de disco".to_string(),
        occurrence_minutes: Some(45),
        service_minutes: Some(90),
    }
}

/// Persist `ticket` with the default allocator.
pub fn create_ticket(repository: &dyn TicketRepository, ticket: &NewTicket) -> Ticket {
    repository
        .create_ticket(&allocator(), 8, ticket)
        .expect("fixture ticket should be created")
}

/// A fully joined view, without touching a repository.
pub fn ticket_view(id: &str) -> TicketView {
    let now = Utc::now();
    TicketView {
        ticket: Ticket {
            id: id.to_string(),
            client_id: 1,
            handler_id: 1,
            category_id: 1,
            project_id: Some(1),
            requester: "Maria Souza".to_string(),
            priority: Priority::High,
            status: TicketStatus::Resolved,
            motive: "Servidor de arquivos fora do ar".to_string(),
            environment: "Produção".to_string(),
            analysis: "Disco cheio no volume de dados".to_string(),
            procedures: "Limpeza de logs antigos".to_string(),
            solution: "Espaço liberado e serviço reiniciado".to_string(),
            observations: "Cliente acompanhou o atendimento".to_string(),
            recommendations: "Monitorar uso de disco".to_string(),
            occurrence_minutes: Some(45),
            service_minutes: Some(90),
            created_at: now,
            closed_at: Some(now),
            updated_at: now,
        },
        client: Client {
            id: 1,
            name: "ACME Ltda".to_string(),
            document: "12.345.678/0001-90".to_string(),
            contact: "Maria Souza".to_string(),
            phone: "(11) 97712-3444".to_string(),
            email: "ti@acme.example".to_string(),
        },
        handler: Handler {
            id: 1,
            name: "plantonista".to_string(),
            phone: String::new(),
            email: String::new(),
        },
        category: "Suporte Técnico".to_string(),
        project: Some(Project {
            id: 1,
            code: "SUP".to_string(),
            name: "Suporte".to_string(),
            manager: "Carlos Lima".to_string(),
            manager_email: "gerente@example.com".to_string(),
            manager_phone: String::new(),
        }),
    }
}
