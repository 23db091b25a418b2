use crate::domain::order::OrderNumber;
use crate::services::OrderResult;

// ============================================================================
// Status Presenter - lookup state → what the customer page shows
// ============================================================================

/// The four states of the customer status page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusView {
    /// Nothing searched yet
    SearchForm,
    NotFound,
    InProduction {
        order_number: OrderNumber,
    },
    Ready {
        order_number: OrderNumber,
        image_url: String,
        download_name: String,
    },
}

impl StatusView {
    pub fn from_result(result: &OrderResult) -> Self {
        match result {
            OrderResult::NotFound => StatusView::NotFound,
            OrderResult::InProduction { order_number } => StatusView::InProduction {
                order_number: order_number.clone(),
            },
            OrderResult::Ready {
                order_number,
                photo_reference,
            } => StatusView::Ready {
                order_number: order_number.clone(),
                image_url: photo_reference.to_string(),
                download_name: format!("looneca-{}.{}", order_number, photo_extension(photo_reference.as_str())),
            },
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            StatusView::SearchForm => "Acompanhe sua Looneca",
            StatusView::NotFound => "Pedido não encontrado",
            StatusView::InProduction { .. } => "Encontramos seu pedido!",
            StatusView::Ready { .. } => "Sua Looneca ficou pronta!",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            StatusView::SearchForm => {
                "Digite o e-mail utilizado na compra para consultar o status do seu pedido"
            }
            StatusView::NotFound => {
                "Não encontramos nenhum pedido com este e-mail. Verifique se digitou corretamente."
            }
            StatusView::InProduction { .. } => {
                "Nossos artistas ainda estão esculpindo sua peça com muito carinho. Volte em breve para ver o resultado final!"
            }
            StatusView::Ready { .. } => {
                "Sua caneca foi finalizada com sucesso! Em breve você receberá um e-mail com informações sobre o envio."
            }
        }
    }

    pub fn status_line(&self) -> Option<&'static str> {
        match self {
            StatusView::InProduction { .. } => Some("Status: Em Produção"),
            StatusView::Ready { .. } => Some("Status: Pronta para envio"),
            _ => None,
        }
    }

    /// Minimal, unstyled page for this view
    pub fn render_html(&self) -> String {
        let mut body = format!(
            "<h1>{}</h1>\n<p>{}</p>\n",
            escape_html(self.headline()),
            escape_html(self.message())
        );

        match self {
            StatusView::SearchForm => {
                body.push_str(SEARCH_FORM);
            }
            StatusView::NotFound => {
                body.push_str("<p><a href=\"/\">Tentar novamente</a></p>\n");
            }
            StatusView::InProduction { order_number } => {
                push_order_block(&mut body, self.status_line(), order_number);
                body.push_str("<p><a href=\"/\">Buscar outro pedido</a></p>\n");
            }
            StatusView::Ready {
                order_number,
                image_url,
                download_name,
            } => {
                push_order_block(&mut body, self.status_line(), order_number);
                body.push_str(&format!(
                    "<img src=\"{url}\" alt=\"Sua Looneca personalizada\">\n\
                     <p><a href=\"{url}\" download=\"{name}\">Baixar Foto</a></p>\n\
                     <p><a href=\"/\">Buscar outro pedido</a></p>\n",
                    url = escape_html(image_url),
                    name = escape_html(download_name),
                ));
            }
        }

        page(&body)
    }
}

/// Page shown when the lookup itself failed
pub fn render_error_html(message: &str) -> String {
    page(&format!(
        "<h1>Erro</h1>\n<p>{}</p>\n<p><a href=\"/\">Tentar novamente</a></p>\n",
        escape_html(message)
    ))
}

const SEARCH_FORM: &str = "<form method=\"get\" action=\"/status\">\n\
<input type=\"email\" name=\"email\" placeholder=\"seu@email.com\" required>\n\
<button type=\"submit\">Buscar Pedido</button>\n\
</form>\n";

fn push_order_block(body: &mut String, status_line: Option<&str>, order_number: &OrderNumber) {
    if let Some(line) = status_line {
        body.push_str(&format!("<p><strong>{}</strong></p>\n", escape_html(line)));
    }
    body.push_str(&format!(
        "<p>Pedido #{}</p>\n",
        escape_html(order_number.as_str())
    ));
}

fn page(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head><meta charset=\"utf-8\"><title>Petloo</title></head>\n<body>\n{}</body>\n</html>\n",
        body
    )
}

/// Extension of the last path segment, `jpg` when there is none
fn photo_extension(reference: &str) -> &str {
    reference
        .rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("jpg")
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
