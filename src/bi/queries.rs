//! DAX query text sent to the semantic model.

use crate::config::BusinessRules;

/// Column returned by [`last_refresh_query`].
pub const LAST_REFRESH_COLUMN: &str = "UltimaAtualizacao";

const ORDER_COLUMNS: [&str; 8] = [
    "'dEmpresas'[Empresa]",
    "'dCalendario'[Data]",
    "'dEquipes'[Nome da Equipe]",
    "'dVendedores'[Nome Vendedor Completo]",
    "'dClientes'[Nome Completo do Cliente]",
    "'fPedidos'[Nota Fiscal - Texto]",
    "'fPedidos'[Pedido - Texto]",
    "'fPedidos'[Legenda Situação]",
];

/// Builds the orders query for one team.
///
/// The query is scoped to the configured org units and, unless disabled, to
/// the current month flag of the calendar table.
///
/// # Example
///
/// ```
/// use team_reports::bi::orders_by_team;
/// use team_reports::config::BusinessRules;
///
/// let query = orders_by_team(200, &BusinessRules::default());
/// assert!(query.contains("'dEquipes'[Equipe] = 200"));
/// assert!(query.contains("'dEmpresas'[Empresa] IN {1, 10, 11, 12, 14}"));
/// ```
pub fn orders_by_team(team_code: i64, rules: &BusinessRules) -> String {
    let org_units = rules
        .org_units
        .iter()
        .map(|unit| unit.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let month_filter = if rules.current_month_only {
        "\n    FILTER(VALUES('dCalendario'[MesAtual]), 'dCalendario'[MesAtual] = TRUE()),"
    } else {
        ""
    };

    let group_by = ORDER_COLUMNS.join(",\n    ");
    let order_by = ORDER_COLUMNS.join(", ");

    format!(
        r#"EVALUATE
SUMMARIZECOLUMNS(
    {group_by},{month_filter}
    FILTER(VALUES('dEmpresas'[Empresa]), 'dEmpresas'[Empresa] IN {{{org_units}}}),
    FILTER(VALUES('dEquipes'[Equipe]), 'dEquipes'[Equipe] = {team_code}),
    "Ingressado", 'Medidas'[Ingressado]
)
ORDER BY {order_by}"#
    )
}

/// Returns the query that reads the model's last refresh timestamp.
pub fn last_refresh_query() -> String {
    format!(
        "EVALUATE ROW(\"{LAST_REFRESH_COLUMN}\", MAX('UltimaAtualizacao'[UltimaAtualizacao]))"
    )
}
